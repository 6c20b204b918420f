//! Multi-format ingestion: PDF, Markdown, and plain text land in the same
//! index; unreadable files are skipped without failing the build.

use std::fs;
use tempfile::TempDir;

use resume_rag::config::{Config, EmbeddingConfig};
use resume_rag::corpus::iter_documents;
use resume_rag::embedding::EmbedderHandle;
use resume_rag::extract::extract_text;
use resume_rag::ingest::{build_people, PersonOutcome};
use resume_rag::retriever::Retriever;
use resume_rag::store::Scope;

/// Minimal valid single-page PDF showing `phrase` in Helvetica.
/// Builds the body then an xref table with correct byte offsets.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[test]
fn test_pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("resume.pdf");
    fs::write(&path, minimal_pdf_with_phrase("kubernetes operator experience")).unwrap();

    let text = extract_text(&path).unwrap();
    assert!(
        text.contains("kubernetes operator experience"),
        "unexpected PDF text: {:?}",
        text
    );
}

#[test]
fn test_mixed_formats_are_scanned_and_sorted() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("c.pdf"), minimal_pdf_with_phrase("pdf phrase")).unwrap();
    fs::write(root.join("a.md"), "# Markdown phrase").unwrap();
    fs::write(root.join("b.txt"), "Plain phrase").unwrap();
    fs::write(root.join("d.docx"), "ignored").unwrap();

    let docs = iter_documents(root).unwrap();
    let names: Vec<String> = docs
        .iter()
        .map(|d| d.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.md", "b.txt", "c.pdf"]);
}

#[tokio::test]
async fn test_pdf_resume_is_searchable() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.paths.data_dir = tmp.path().join("data");
    config.paths.storage_dir = tmp.path().join("storage");
    config.embedding = EmbeddingConfig::hashing(128);

    let ana = config.paths.data_dir.join("Ana");
    fs::create_dir_all(&ana).unwrap();
    fs::write(ana.join("resume.pdf"), minimal_pdf_with_phrase("kubernetes operator experience")).unwrap();
    fs::write(ana.join("corrupt.pdf"), b"%PDF-1.4 truncated").unwrap();

    let embedder = EmbedderHandle::new(config.embedding.clone());
    let report = build_people(&config, &embedder).await.unwrap();
    assert_eq!(
        report.outcome("Ana"),
        Some(&PersonOutcome::Built {
            chunks: 1,
            documents: 1
        })
    );

    let retriever = Retriever::from_config(&config, Scope::Person("Ana".to_string()), embedder);
    let hits = retriever.retrieve("kubernetes", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].source.ends_with("resume.pdf"));
}

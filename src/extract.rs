//! Text extraction for the supported document formats.
//!
//! Dispatches on file extension: `.pdf` is parsed page by page, `.txt` and
//! `.md` are decoded as UTF-8 with invalid sequences replaced. Extraction
//! never panics; failures come back as [`RagError::Extraction`] and the
//! ingestion pipeline skips the file.

use std::path::Path;

use crate::error::{RagError, Result};

/// File extensions the pipeline will ingest (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

/// Extracts plain text from the file at `path`.
pub fn extract_text(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|e| extraction_error(path, e))?;
            extract_pdf(&bytes).map_err(|message| RagError::Extraction {
                path: path.to_path_buf(),
                message,
            })
        }
        "txt" | "md" => {
            let bytes = std::fs::read(path).map_err(|e| extraction_error(path, e))?;
            Ok(decode_text(&bytes))
        }
        other => Err(RagError::Extraction {
            path: path.to_path_buf(),
            message: format!("unsupported file type: '{}'", other),
        }),
    }
}

fn extraction_error(path: &Path, e: impl std::fmt::Display) -> RagError {
    RagError::Extraction {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Lossy UTF-8 decode; a leading byte-order mark is dropped.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Per-page PDF text, joined with newlines.
///
/// Pages whose text cannot be extracted are skipped. When the per-page
/// pass yields nothing (unusual font encodings), the whole document is
/// retried with `pdf-extract`.
fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    let per_page = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => {
            let pages: Vec<String> = doc
                .get_pages()
                .keys()
                .filter_map(|&page| doc.extract_text(&[page]).ok())
                .collect();
            pages.join("\n").trim().to_string()
        }
        Err(_) => String::new(),
    };

    if !per_page.is_empty() {
        return Ok(per_page);
    }

    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| format!("PDF extraction failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unsupported_extension_returns_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cv.docx");
        fs::write(&path, b"whatever").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, RagError::Extraction { .. }));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, RagError::Extraction { .. }));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cv.txt");
        fs::write(&path, b"Ana \xff\xfe backend").unwrap();
        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("Ana "));
        assert!(text.ends_with(" backend"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("NOTES.MD");
        fs::write(&path, "# Notes").unwrap();
        assert_eq!(extract_text(&path).unwrap(), "# Notes");
    }

    #[test]
    fn bom_is_stripped() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhola"), "hola");
    }

    #[test]
    fn missing_file_is_an_extraction_error() {
        let err = extract_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, RagError::Extraction { .. }));
    }
}

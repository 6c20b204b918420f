//! Index building.
//!
//! Coordinates the offline flow: scan → extract → chunk → embed → index →
//! persist. Two layouts are supported:
//!
//! - **Global**: every document under the data root goes into one index at
//!   `storage/`. Metadata `source` is the file's base name.
//! - **Per person**: each immediate subdirectory of the data root is a
//!   person with its own index at `storage/<Name>/`. Metadata `source` is
//!   the full path of the file.
//!
//! Builds always rewrite a scope wholesale. A person with no usable text is
//! skipped with a warning and reported; the remaining people still build.

use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::chunk::{chunk_document, ChunkParams};
use crate::config::Config;
use crate::corpus::{iter_documents, person_dirs};
use crate::embedding::EmbedderHandle;
use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::models::{Chunk, Document};
use crate::store::{save_scope, ChunkMeta, MetaStore, Scope, ScopePaths};

/// What a successful scope build wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSummary {
    pub documents: usize,
    pub chunks: usize,
    pub dim: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonOutcome {
    Built { chunks: usize, documents: usize },
    Skipped { reason: String },
}

/// Per-person results of a multi-person build, in directory order.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub people: Vec<(String, PersonOutcome)>,
}

impl BuildReport {
    pub fn built(&self) -> usize {
        self.people
            .iter()
            .filter(|(_, o)| matches!(o, PersonOutcome::Built { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.people.len() - self.built()
    }

    pub fn outcome(&self, name: &str) -> Option<&PersonOutcome> {
        self.people
            .iter()
            .find(|(person, _)| person == name)
            .map(|(_, outcome)| outcome)
    }
}

/// How chunk sources are recorded in the metadata.
#[derive(Debug, Clone, Copy)]
enum SourceStyle {
    FileName,
    FullPath,
}

impl SourceStyle {
    fn render(self, path: &Path) -> String {
        match self {
            SourceStyle::FileName => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            SourceStyle::FullPath => path.display().to_string(),
        }
    }
}

/// Build the single global index from every document under the data root.
///
/// Fails with [`RagError::EmptyCorpus`] without writing anything when the
/// corpus yields no chunks.
pub async fn build_global(config: &Config, embedder: &EmbedderHandle) -> Result<ScopeSummary> {
    let data_dir = &config.paths.data_dir;
    let params = config.chunking.params()?;
    let docs = iter_documents(data_dir)?;
    info!(documents = docs.len(), root = %data_dir.display(), "scanned global corpus");

    let paths = Scope::Global.paths(&config.paths.storage_dir);
    match build_scope(&docs, &params, embedder, &paths, SourceStyle::FileName).await? {
        Some(summary) => {
            info!(
                chunks = summary.chunks,
                dim = summary.dim,
                path = %paths.index.display(),
                "global index written"
            );
            Ok(summary)
        }
        None => Err(RagError::EmptyCorpus(data_dir.clone())),
    }
}

/// Build one index per subdirectory of the data root.
pub async fn build_people(config: &Config, embedder: &EmbedderHandle) -> Result<BuildReport> {
    let data_dir = &config.paths.data_dir;
    let people = person_dirs(data_dir)?;
    if people.is_empty() {
        return Err(RagError::EmptyCorpus(data_dir.clone()));
    }

    let params = config.chunking.params()?;
    let mut report = BuildReport::default();
    for (name, dir) in people {
        let outcome = build_person_dir(config, embedder, &params, &name, &dir).await?;
        report.people.push((name, outcome));
    }

    info!(
        built = report.built(),
        skipped = report.skipped(),
        "per-person build finished"
    );
    Ok(report)
}

/// Build the index for a single person (`data/<name>/`).
pub async fn build_person(
    config: &Config,
    embedder: &EmbedderHandle,
    name: &str,
) -> Result<PersonOutcome> {
    let dir = config.paths.data_dir.join(name);
    if !dir.is_dir() {
        return Err(RagError::Config(format!(
            "no data directory for '{}' at {}",
            name,
            dir.display()
        )));
    }
    let params = config.chunking.params()?;
    build_person_dir(config, embedder, &params, name, &dir).await
}

async fn build_person_dir(
    config: &Config,
    embedder: &EmbedderHandle,
    params: &ChunkParams,
    name: &str,
    dir: &Path,
) -> Result<PersonOutcome> {
    let docs = iter_documents(dir)?;
    let paths = Scope::Person(name.to_string()).paths(&config.paths.storage_dir);

    match build_scope(&docs, params, embedder, &paths, SourceStyle::FullPath).await? {
        Some(summary) => {
            info!(
                person = name,
                documents = summary.documents,
                chunks = summary.chunks,
                "person index written"
            );
            Ok(PersonOutcome::Built {
                chunks: summary.chunks,
                documents: summary.documents,
            })
        }
        None => {
            let reason = if docs.is_empty() {
                "no readable documents".to_string()
            } else {
                "documents produced no text".to_string()
            };
            warn!(person = name, reason = %reason, "skipping person");
            Ok(PersonOutcome::Skipped { reason })
        }
    }
}

/// Chunk, embed, and persist `docs` into `paths`. `None` when there is
/// nothing to index; nothing is written in that case.
async fn build_scope(
    docs: &[Document],
    params: &ChunkParams,
    embedder: &EmbedderHandle,
    paths: &ScopePaths,
    style: SourceStyle,
) -> Result<Option<ScopeSummary>> {
    let chunks: Vec<Chunk> = docs
        .iter()
        .flat_map(|doc| chunk_document(doc, params))
        .collect();
    if chunks.is_empty() {
        return Ok(None);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    let backend = embedder.get().await?;
    let dim = vectors.first().map(|v| v.len()).unwrap_or_else(|| backend.dims());
    let index = FlatIndex::build(dim, &vectors)?;

    let meta = MetaStore {
        dim,
        chunks: chunks
            .into_iter()
            .map(|c| ChunkMeta {
                source: style.render(&c.source),
                chunk_id: c.chunk_id,
                text: c.text,
            })
            .collect(),
        model: Some(backend.model_name().to_string()),
        built_at: Some(Utc::now()),
    };

    save_scope(paths, &index, &meta)?;
    Ok(Some(ScopeSummary {
        documents: docs.len(),
        chunks: meta.chunks.len(),
        dim,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::store::load_scope;
    use std::fs;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = root.join("data");
        config.paths.storage_dir = root.join("storage");
        config.embedding = EmbeddingConfig::hashing(64);
        config
    }

    #[tokio::test]
    async fn global_build_uses_file_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(config.paths.data_dir.join("Ana")).unwrap();
        fs::write(
            config.paths.data_dir.join("Ana/cv.txt"),
            "Ana has 5 years of experience.",
        )
        .unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        let summary = build_global(&config, &embedder).await.unwrap();
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.dim, 64);

        let loaded = load_scope(&Scope::Global, &config.paths.storage_dir).unwrap();
        assert_eq!(loaded.meta.chunks[0].source, "cv.txt");
        assert_eq!(loaded.meta.model.as_deref(), Some("hash-64"));
        assert!(loaded.meta.built_at.is_some());
    }

    #[tokio::test]
    async fn empty_global_corpus_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(&config.paths.data_dir).unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        let err = build_global(&config, &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus(_)));
        assert!(!config.paths.storage_dir.join("index.bin").exists());
    }

    #[tokio::test]
    async fn people_build_skips_empty_person() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let data = &config.paths.data_dir;
        fs::create_dir_all(data.join("Ana")).unwrap();
        fs::create_dir_all(data.join("Luis")).unwrap();
        fs::write(data.join("Ana/cv.md"), "Backend engineer. Rust and Go.").unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        let report = build_people(&config, &embedder).await.unwrap();
        assert_eq!(report.built(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.outcome("Luis"),
            Some(PersonOutcome::Skipped { .. })
        ));

        let ana = load_scope(&Scope::Person("Ana".to_string()), &config.paths.storage_dir).unwrap();
        assert!(ana.meta.chunks[0].source.ends_with("cv.md"));
        assert!(ana.meta.chunks[0].source.contains("Ana"));
        assert!(!config.paths.storage_dir.join("Luis").exists());
    }

    #[tokio::test]
    async fn people_build_without_subdirectories_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(&config.paths.data_dir).unwrap();
        fs::write(config.paths.data_dir.join("stray.txt"), "x").unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        let err = build_people(&config, &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus(_)));
    }

    #[tokio::test]
    async fn unknown_person_is_a_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(&config.paths.data_dir).unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        let err = build_person(&config, &embedder, "Nadie").await.unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[tokio::test]
    async fn chunk_ids_restart_per_document() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        config.chunking.chunk_size = 60;
        config.chunking.overlap = 10;
        let dir = config.paths.data_dir.join("Ana");
        fs::create_dir_all(&dir).unwrap();
        let long = "Worked on payments. Led a team of four. Shipped search. ".repeat(4);
        fs::write(dir.join("a.txt"), &long).unwrap();
        fs::write(dir.join("b.txt"), &long).unwrap();
        let embedder = EmbedderHandle::new(config.embedding.clone());

        build_person(&config, &embedder, "Ana").await.unwrap();
        let loaded = load_scope(&Scope::Person("Ana".to_string()), &config.paths.storage_dir).unwrap();
        let firsts = loaded
            .meta
            .chunks
            .iter()
            .filter(|c| c.chunk_id == 0)
            .count();
        assert_eq!(firsts, 2);
        assert_eq!(loaded.index.len(), loaded.meta.chunks.len());
    }
}

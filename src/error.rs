//! Error taxonomy for the retrieval engine.
//!
//! Every fallible library operation returns [`Result`]. The binary wraps
//! these in `anyhow` and prints them verbatim.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by ingestion, retrieval, routing, and answering.
#[derive(Error, Debug)]
pub enum RagError {
    /// Bad or missing configuration: registry file, zero people, invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// None of the generation provider variables is set.
    #[error(
        "no generation provider configured: set OLLAMA_MODEL, OPENAI_API_KEY or ANTHROPIC_API_KEY"
    )]
    NoProvider,

    /// Index or metadata file is absent.
    #[error("no index found for {scope} at {}: run `rrag build{hint}` first", .path.display())]
    IndexMissing {
        scope: String,
        path: PathBuf,
        hint: String,
    },

    /// Index or metadata file exists but cannot be trusted.
    #[error("invalid index for {scope} ({reason}): run `rrag build{hint}` to rebuild it")]
    IndexInvalid {
        scope: String,
        reason: String,
        hint: String,
    },

    /// A single document could not be read or decoded.
    #[error("failed to extract {}: {message}", .path.display())]
    Extraction { path: PathBuf, message: String },

    /// A global build produced zero chunks.
    #[error("no documents to index under {}: add PDF/TXT/MD files first", .0.display())]
    EmptyCorpus(PathBuf),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// True for the two "run the builder" conditions.
    pub fn is_index_missing(&self) -> bool {
        matches!(
            self,
            RagError::IndexMissing { .. } | RagError::IndexInvalid { .. }
        )
    }
}

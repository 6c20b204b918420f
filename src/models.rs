//! Core data models that flow through ingestion and retrieval.

use serde::Serialize;
use std::path::PathBuf;

/// A file read from the data root, already extracted to text.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

/// A bounded slice of a document's cleaned text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Path of the document this chunk was cut from.
    pub source: PathBuf,
    /// Sequence number within the source document, starting at 0.
    pub chunk_id: usize,
    pub text: String,
}

/// One retrieval result.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    /// Raw inner product between the query and the chunk vector.
    pub score: f32,
    pub text: String,
    pub source: String,
    /// Position of the chunk in the index it was found in.
    pub chunk_id: usize,
    /// Person (or the global scope label) the index belongs to.
    pub entity: String,
}

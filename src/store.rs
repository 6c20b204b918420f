//! Persisted scopes: an index file plus its chunk metadata.
//!
//! A scope is either the global index (`storage/`) or one person's index
//! (`storage/<Name>/`). Both use the same pair of files:
//!
//! - `index.bin`: the [`FlatIndex`] binary
//! - `meta.json`: `{dim, chunks: [{text, source, chunk_id}], model?, built_at?}`
//!
//! Position `i` of the index corresponds to `chunks[i]`. Loading checks
//! that invariant and reports any violation as [`RagError::IndexInvalid`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::index::FlatIndex;

pub const INDEX_FILE: &str = "index.bin";
pub const META_FILE: &str = "meta.json";

/// Which persisted index a caller wants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Person(String),
}

impl Scope {
    /// Name attached to hits from this scope.
    pub fn entity(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Person(name) => name,
        }
    }

    /// Arguments to `rrag build` that recreate this scope.
    pub fn build_hint(&self) -> String {
        match self {
            Scope::Global => String::new(),
            Scope::Person(name) => format!(" --person {}", name),
        }
    }

    pub fn paths(&self, storage_dir: &Path) -> ScopePaths {
        match self {
            Scope::Global => ScopePaths::in_dir(storage_dir),
            Scope::Person(name) => ScopePaths::in_dir(&storage_dir.join(name)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "the global index"),
            Scope::Person(name) => write!(f, "person '{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePaths {
    pub dir: PathBuf,
    pub index: PathBuf,
    pub meta: PathBuf,
}

impl ScopePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            index: dir.join(INDEX_FILE),
            meta: dir.join(META_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub text: String,
    pub source: String,
    pub chunk_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaStore {
    pub dim: usize,
    pub chunks: Vec<ChunkMeta>,
    /// Embedding model that produced the vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
}

impl MetaStore {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// A scope's index and metadata, loaded and checked for alignment.
#[derive(Debug, Clone)]
pub struct LoadedScope {
    pub index: FlatIndex,
    pub meta: MetaStore,
}

/// Write both files of a scope, index first.
pub fn save_scope(paths: &ScopePaths, index: &FlatIndex, meta: &MetaStore) -> Result<()> {
    std::fs::create_dir_all(&paths.dir)?;
    index.persist(&paths.index)?;
    meta.write(&paths.meta)
}

/// Load and validate a scope from `storage_dir`.
pub fn load_scope(scope: &Scope, storage_dir: &Path) -> Result<LoadedScope> {
    let paths = scope.paths(storage_dir);
    for path in [&paths.index, &paths.meta] {
        if !path.is_file() {
            return Err(RagError::IndexMissing {
                scope: scope.to_string(),
                path: path.clone(),
                hint: scope.build_hint(),
            });
        }
    }

    let invalid = |reason: String| RagError::IndexInvalid {
        scope: scope.to_string(),
        reason,
        hint: scope.build_hint(),
    };

    let index = FlatIndex::load(&paths.index)?.map_err(invalid)?;
    let meta = match MetaStore::read(&paths.meta) {
        Ok(meta) => meta,
        Err(RagError::Json(e)) => return Err(invalid(format!("unreadable {}: {}", META_FILE, e))),
        Err(e) => return Err(e),
    };

    if meta.dim != index.dim() {
        return Err(invalid(format!(
            "metadata dim {} does not match index dim {}",
            meta.dim,
            index.dim()
        )));
    }
    if meta.chunks.len() != index.len() {
        return Err(invalid(format!(
            "index holds {} vectors but metadata lists {} chunks",
            index.len(),
            meta.chunks.len()
        )));
    }

    Ok(LoadedScope { index, meta })
}

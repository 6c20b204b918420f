//! Filesystem scanning for the data root.
//!
//! Walks a directory tree, keeps files whose extension is supported, and
//! extracts their text. Files that fail extraction or are empty after
//! cleaning are skipped with a warning; a bad file never aborts a scan.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::chunk::clean_text;
use crate::error::{RagError, Result};
use crate::extract::{extract_text, SUPPORTED_EXTENSIONS};
use crate::models::Document;

/// Recursively read every supported document under `root`, sorted by path.
pub fn iter_documents(root: &Path) -> Result<Vec<Document>> {
    if !root.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("data directory does not exist: {}", root.display()),
        )));
    }

    let include_set = supported_globset()?;
    let mut docs = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !include_set.is_match(relative) {
            continue;
        }

        match extract_text(path) {
            Ok(text) if clean_text(&text).is_empty() => {
                warn!(path = %path.display(), "skipping empty document");
            }
            Ok(text) => docs.push(Document {
                path: path.to_path_buf(),
                text,
            }),
            Err(e) => warn!(path = %path.display(), error = %e, "could not read document"),
        }
    }

    docs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(docs)
}

/// Immediate subdirectories of `root`, one per person, sorted by name.
pub fn person_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut people = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        people.push((name, entry.path()));
    }
    people.sort();
    Ok(people)
}

fn supported_globset() -> Result<GlobSet> {
    let patterns: Vec<String> = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect();
    build_globset(&patterns)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RagError::Config(format!("bad glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| RagError::Config(format!("bad glob set: {}", e)))
}

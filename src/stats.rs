//! Index statistics and health overview.
//!
//! Summarizes what is persisted under the storage root: the global index
//! and every per-person index, with chunk counts, dimensionality, the
//! embedding model, and when each was built. Used by `rrag stats` to
//! confirm that a build produced what was expected.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::store::{load_scope, Scope, META_FILE};

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeStatus {
    Ready {
        chunks: usize,
        documents: usize,
        dim: usize,
        model: Option<String>,
        built_at: Option<DateTime<Utc>>,
        bytes: u64,
    },
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStats {
    pub scope: Scope,
    pub status: ScopeStatus,
}

/// Inspect the global scope plus every person directory under storage.
pub fn collect_stats(storage_dir: &Path) -> Result<Vec<ScopeStats>> {
    let mut scopes = vec![Scope::Global];
    if storage_dir.is_dir() {
        let mut people = BTreeSet::new();
        for entry in std::fs::read_dir(storage_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.path().join(META_FILE).exists() {
                people.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
        scopes.extend(people.into_iter().map(Scope::Person));
    }

    Ok(scopes
        .into_iter()
        .map(|scope| {
            let status = inspect(&scope, storage_dir);
            ScopeStats { scope, status }
        })
        .collect())
}

fn inspect(scope: &Scope, storage_dir: &Path) -> ScopeStatus {
    match load_scope(scope, storage_dir) {
        Ok(loaded) => {
            let paths = scope.paths(storage_dir);
            let bytes = [&paths.index, &paths.meta]
                .iter()
                .filter_map(|p| std::fs::metadata(p).ok())
                .map(|m| m.len())
                .sum();
            let documents = loaded
                .meta
                .chunks
                .iter()
                .map(|c| c.source.as_str())
                .collect::<BTreeSet<_>>()
                .len();
            ScopeStatus::Ready {
                chunks: loaded.meta.chunks.len(),
                documents,
                dim: loaded.meta.dim,
                model: loaded.meta.model,
                built_at: loaded.meta.built_at,
                bytes,
            }
        }
        Err(RagError::IndexMissing { .. }) => ScopeStatus::Missing,
        Err(RagError::IndexInvalid { reason, .. }) => ScopeStatus::Invalid(reason),
        Err(e) => ScopeStatus::Invalid(e.to_string()),
    }
}

/// Run the stats command: inspect storage and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let stats = collect_stats(&config.paths.storage_dir)?;

    println!("Resume RAG: Index Stats");
    println!("=======================");
    println!();
    println!("  Storage:     {}", config.paths.storage_dir.display());
    println!();
    println!("{}", header_line());
    println!("  {}", "-".repeat(RULE_WIDTH));

    for s in &stats {
        let label = s.scope.entity();
        match &s.status {
            ScopeStatus::Ready {
                chunks,
                documents,
                dim,
                model,
                built_at,
                bytes,
            } => println!(
                "  {:<12} {:>4} {:>6} {:>4} {:>9}  {:<22} {}",
                fit(label, 12),
                documents,
                chunks,
                dim,
                format_bytes(*bytes),
                fit(model.as_deref().unwrap_or("-"), 22),
                built_at
                    .map(format_relative)
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            ScopeStatus::Missing => println!("  {:<12} not built", fit(label, 12)),
            ScopeStatus::Invalid(reason) => println!("  {:<12} invalid: {}", fit(label, 12), reason),
        }
    }

    println!();
    Ok(())
}

const RULE_WIDTH: usize = 76;

fn header_line() -> String {
    format!(
        "  {:<12} {:>4} {:>6} {:>4} {:>9}  {:<22} {}",
        "SCOPE", "DOCS", "CHUNKS", "DIM", "SIZE", "MODEL", "BUILT"
    )
}

/// Cut `s` to at most `width` chars, marking the cut with `~`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to now (e.g. "3 hours ago").
fn format_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        ts.format("%Y-%m-%d %H:%M").to_string()
    } else if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}

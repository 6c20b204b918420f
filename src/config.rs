//! Configuration loading.
//!
//! Settings come from an optional TOML file (`config/rag.toml` by default),
//! then environment overrides (`EMBEDDING_MODEL`, `TOP_K`, ...), then
//! validation. Every section is optional and falls back to the defaults
//! below, so running without a config file is the normal case.
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//! storage_dir = "storage"
//! registry = "config/people.json"
//!
//! [chunking]
//! chunk_size = 1000
//! overlap = 150
//!
//! [retrieval]
//! top_k = 4
//!
//! [embedding]
//! provider = "local"
//! model = "paraphrase-multilingual-MiniLM-L12-v2"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::ChunkParams;
use crate::error::{RagError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_dir: default_storage_dir(),
            registry: default_registry(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}
fn default_registry() -> PathBuf {
    PathBuf::from("config/people.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunk_size, self.overlap)
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

/// Embedding backend settings.
///
/// `provider` is one of `local` (fastembed), `openai`, `ollama` or `hash`.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama backend.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    /// Offline deterministic embedder, mostly for tests.
    pub fn hashing(dims: usize) -> Self {
        Self {
            provider: "hash".to_string(),
            model: format!("hash-{}", dims),
            dims: Some(dims),
            ..Self::default()
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_model() -> String {
    "paraphrase-multilingual-MiniLM-L12-v2".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_generation_timeout() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    800
}

impl Config {
    /// Apply environment overrides through `lookup` (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("EMBEDDING_MODEL").filter(|v| !v.trim().is_empty()) {
            self.embedding.model = model;
        }
        if let Some(provider) = lookup("EMBEDDING_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.embedding.provider = provider;
        }
        if let Some(top_k) = lookup("TOP_K") {
            self.retrieval.top_k = top_k.trim().parse().map_err(|_| {
                RagError::Config(format!("TOP_K must be a positive integer, got '{}'", top_k))
            })?;
        }
        if let Some(dir) = lookup("RAG_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RAG_STORAGE_DIR") {
            self.paths.storage_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("RAG_REGISTRY") {
            self.paths.registry = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.params()?;

        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("retrieval.top_k must be >= 1".to_string()));
        }

        if self.embedding.batch_size == 0 {
            return Err(RagError::Config(
                "embedding.batch_size must be >= 1".to_string(),
            ));
        }

        match self.embedding.provider.as_str() {
            "local" | "hash" => {}
            "openai" | "ollama" => {
                if self.embedding.dims.unwrap_or(0) == 0 {
                    return Err(RagError::Config(format!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    )));
                }
            }
            other => {
                return Err(RagError::Config(format!(
                    "unknown embedding provider: '{}'. Must be local, openai, ollama, or hash.",
                    other
                )))
            }
        }

        if self.embedding.dims == Some(0) {
            return Err(RagError::Config("embedding.dims must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Load `path` if it exists (defaults otherwise), then apply the process
/// environment and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str::<Config>(&content).map_err(|e| {
            RagError::Config(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?
    } else {
        Config::default()
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

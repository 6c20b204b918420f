//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete backends:
//! - **`LocalEmbedder`** — runs sentence-transformer models locally via
//!   fastembed; the model is downloaded once and kept in memory.
//! - **[`OpenAIEmbedder`]** — calls the OpenAI embeddings API with retry and backoff.
//! - **[`OllamaEmbedder`]** — calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`HashEmbedder`]** — deterministic token hashing; offline, no model.
//!
//! Callers never talk to a backend directly. They hold an
//! [`EmbedderHandle`], a cheaply clonable handle that constructs its
//! backend on first use and re-normalizes every row it returns, so all
//! vectors leaving this module have unit L2 norm.
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama backends use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

mod hashing;
#[cfg(feature = "local-embeddings-fastembed")]
mod local_fastembed;

pub use hashing::HashEmbedder;
#[cfg(feature = "local-embeddings-fastembed")]
pub use local_fastembed::LocalEmbedder;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"paraphrase-multilingual-MiniLM-L12-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Shared, lazily initialized embedding backend.
///
/// Clones share one backend. The first call to [`get`](Self::get) (or any
/// embed call) constructs it; construction errors are returned to that
/// caller and the next call tries again.
#[derive(Clone)]
pub struct EmbedderHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    config: EmbeddingConfig,
    backend: OnceCell<Arc<dyn Embedder>>,
}

impl EmbedderHandle {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                config,
                backend: OnceCell::new(),
            }),
        }
    }

    /// Wrap an already constructed backend.
    pub fn from_embedder(embedder: Arc<dyn Embedder>) -> Self {
        let config = EmbeddingConfig {
            model: embedder.model_name().to_string(),
            dims: Some(embedder.dims()),
            ..EmbeddingConfig::default()
        };
        Self {
            inner: Arc::new(HandleInner {
                config,
                backend: OnceCell::new_with(Some(embedder)),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.backend.initialized()
    }

    /// The backend, constructing it on first use.
    pub async fn get(&self) -> Result<Arc<dyn Embedder>> {
        let backend = self
            .inner
            .backend
            .get_or_try_init(|| create_embedder(&self.inner.config))
            .await?;
        Ok(Arc::clone(backend))
    }

    /// Embed `texts` in batches of `embedding.batch_size`; every row is
    /// L2-normalized.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let backend = self.get().await?;
        let batch_size = self.inner.config.batch_size.max(1);

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let vectors = backend.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "backend returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            out.extend(vectors);
        }

        let dims = out[0].len();
        for v in &mut out {
            if v.len() != dims {
                return Err(RagError::Embedding(format!(
                    "inconsistent embedding dimensions: {} vs {}",
                    v.len(),
                    dims
                )));
            }
            l2_normalize(v);
        }
        debug!(count = out.len(), dims, "embedded texts");
        Ok(out)
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
    }
}

/// Construct the backend named by `config.provider`.
///
/// | Config Value | Backend |
/// |-------------|----------|
/// | `"local"` | `LocalEmbedder` (fastembed feature) |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"hash"` | [`HashEmbedder`] |
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    info!(provider = %config.provider, model = %config.model, "initializing embedder");
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(
            config.dims.unwrap_or(hashing::DEFAULT_DIMS),
        ))),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config).await?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(RagError::Embedding(
            "local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(RagError::Config(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI Backend ============

/// Embedding backend using the OpenAI API.
///
/// Calls `POST /v1/embeddings`; requires `OPENAI_API_KEY`.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = config
            .dims
            .ok_or_else(|| RagError::Config("embedding.dims required for OpenAI".to_string()))?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            dims,
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let request = || {
            self.client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
        };
        let json = send_with_retry("OpenAI", self.max_retries, request).await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding` arrays, ordered by their `index` field.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid_response("OpenAI", "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| invalid_response("OpenAI", "missing embedding"))?;
        indexed.push((index, json_to_vec(embedding, "OpenAI")?));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Backend ============

/// Embedding backend using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = config
            .dims
            .ok_or_else(|| RagError::Config("embedding.dims required for Ollama".to_string()))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            dims,
            url,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let request = || self.client.post(&endpoint).json(&body);
        let json = send_with_retry("Ollama", self.max_retries, request).await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid_response("Ollama", "missing embeddings array"))?
        .iter()
        .map(|embedding| json_to_vec(embedding, "Ollama"))
        .collect()
}

// ============ HTTP helpers ============

/// POST with exponential backoff on 429/5xx and network errors.
async fn send_with_retry<F>(
    service: &str,
    max_retries: u32,
    request: F,
) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| RagError::Embedding(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = RagError::Embedding(format!(
                    "{} API error {}: {}",
                    service, status, body_text
                ));
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(RagError::Embedding(format!(
                    "{} connection error: {}",
                    service, e
                )));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        RagError::Embedding(format!("{} embedding failed after retries", service))
    }))
}

fn json_to_vec(value: &serde_json::Value, service: &str) -> Result<Vec<f32>> {
    Ok(value
        .as_array()
        .ok_or_else(|| invalid_response(service, "embedding is not an array"))?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

fn invalid_response(service: &str, what: &str) -> RagError {
    RagError::Embedding(format!("invalid {} response: {}", service, what))
}

// ============ Vector utilities ============

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Encode a float vector as little-endian `f32` bytes.
///
/// ```rust
/// use resume_rag::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes; a trailing partial value is ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

//! Local sentence-transformer inference via fastembed.
//!
//! The model is downloaded from Hugging Face on first load and cached on
//! disk; after that no network calls are made. Loading and inference both
//! run on the blocking pool.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalEmbedder {
    /// Download (if needed) and load the configured model.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let (fastembed_model, default_dims) = resolve_model(&config.model)?;
        let dims = config.dims.unwrap_or(default_dims);

        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| {
                RagError::Embedding(format!("failed to initialize local embedding model: {}", e))
            })
        })
        .await
        .map_err(|e| RagError::Embedding(e.to_string()))??;

        Ok(Self {
            model_name: config.model.clone(),
            dims,
            batch_size: config.batch_size,
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RagError::Embedding("local model lock poisoned".to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| RagError::Embedding(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::Embedding(e.to_string()))?
    }
}

/// Map a configured model name to a fastembed model and its dimensionality.
///
/// Names are matched case-insensitively and may carry the
/// `sentence-transformers/` prefix.
fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel as M;

    let lower = name.to_ascii_lowercase();
    let key = lower
        .strip_prefix("sentence-transformers/")
        .unwrap_or(&lower);

    let resolved = match key {
        "paraphrase-multilingual-minilm-l12-v2" => (M::ParaphraseMLMiniLML12V2, 384),
        "paraphrase-multilingual-mpnet-base-v2" => (M::ParaphraseMLMpnetBaseV2, 768),
        "all-minilm-l6-v2" => (M::AllMiniLML6V2, 384),
        "all-minilm-l12-v2" => (M::AllMiniLML12V2, 384),
        "bge-small-en-v1.5" => (M::BGESmallENV15, 384),
        "bge-base-en-v1.5" => (M::BGEBaseENV15, 768),
        "bge-large-en-v1.5" => (M::BGELargeENV15, 1024),
        "nomic-embed-text-v1" => (M::NomicEmbedTextV1, 768),
        "nomic-embed-text-v1.5" => (M::NomicEmbedTextV15, 768),
        "multilingual-e5-small" => (M::MultilingualE5Small, 384),
        "multilingual-e5-base" => (M::MultilingualE5Base, 768),
        "multilingual-e5-large" => (M::MultilingualE5Large, 1024),
        other => {
            return Err(RagError::Config(format!(
                "unknown local embedding model: '{}'. Supported models: \
                 paraphrase-multilingual-MiniLM-L12-v2, paraphrase-multilingual-mpnet-base-v2, \
                 all-minilm-l6-v2, all-minilm-l12-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
                 bge-large-en-v1.5, nomic-embed-text-v1, nomic-embed-text-v1.5, \
                 multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
                other
            )))
        }
    };
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_default_model_with_prefix() {
        let (_, dims) =
            resolve_model("sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2").unwrap();
        assert_eq!(dims, 384);
    }

    #[test]
    fn rejects_unknown_model() {
        assert!(resolve_model("word2vec").is_err());
    }
}

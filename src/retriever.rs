//! Query-time retrieval over one persisted scope.
//!
//! A [`Retriever`] owns a scope (global or one person), a shared
//! [`EmbedderHandle`], and a lazily populated cache of the scope's index
//! and metadata. The first retrieval reads both files; later calls reuse
//! them until [`Retriever::reload`] drops the cache.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> resume_rag::error::Result<()> {
//! use resume_rag::config::EmbeddingConfig;
//! use resume_rag::embedding::EmbedderHandle;
//! use resume_rag::retriever::Retriever;
//! use resume_rag::store::Scope;
//!
//! let embedder = EmbedderHandle::new(EmbeddingConfig::default());
//! let retriever = Retriever::new(Scope::Person("Ana".into()), "storage", embedder, 4);
//! for hit in retriever.retrieve("years of experience", None).await? {
//!     println!("{:.3} {} {}", hit.score, hit.source, hit.text);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::embedding::EmbedderHandle;
use crate::error::{RagError, Result};
use crate::index::SENTINEL;
use crate::models::Hit;
use crate::store::{load_scope, LoadedScope, Scope};

pub struct Retriever {
    scope: Scope,
    storage_dir: PathBuf,
    embedder: EmbedderHandle,
    top_k: usize,
    cache: RwLock<Option<Arc<LoadedScope>>>,
}

impl Retriever {
    pub fn new(
        scope: Scope,
        storage_dir: impl AsRef<Path>,
        embedder: EmbedderHandle,
        top_k: usize,
    ) -> Self {
        Self {
            scope,
            storage_dir: storage_dir.as_ref().to_path_buf(),
            embedder,
            top_k,
            cache: RwLock::new(None),
        }
    }

    /// Retriever for `scope` using the configured storage root and `top_k`.
    pub fn from_config(config: &Config, scope: Scope, embedder: EmbedderHandle) -> Self {
        Self::new(
            scope,
            &config.paths.storage_dir,
            embedder,
            config.retrieval.top_k,
        )
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The scope's index and metadata, read from disk on first use.
    pub async fn load(&self) -> Result<Arc<LoadedScope>> {
        if let Some(loaded) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(loaded));
        }

        let mut guard = self.cache.write().await;
        if let Some(loaded) = guard.as_ref() {
            return Ok(Arc::clone(loaded));
        }
        let loaded = Arc::new(load_scope(&self.scope, &self.storage_dir)?);
        debug!(
            scope = %self.scope,
            vectors = loaded.index.len(),
            dim = loaded.index.dim(),
            "loaded index"
        );
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Forget the cached index; the next call reads from disk again.
    pub async fn reload(&self) {
        *self.cache.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Top-`k` chunks for `query`, best first.
    ///
    /// `top_k` defaults to the retriever's configured value. Empty result
    /// slots are dropped, so fewer than `k` hits come back when the scope
    /// holds fewer than `k` chunks.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<Hit>> {
        let k = top_k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(RagError::InvalidArgument("top_k must be >= 1".to_string()));
        }

        let loaded = self.load().await?;
        let query_vec = self.embedder.embed_query(query).await?;
        if query_vec.len() != loaded.index.dim() {
            return Err(RagError::IndexInvalid {
                scope: self.scope.to_string(),
                reason: format!(
                    "index has dim {} but the embedder produces {}",
                    loaded.index.dim(),
                    query_vec.len()
                ),
                hint: self.scope.build_hint(),
            });
        }

        // Rows past the index size would only hold sentinels.
        let k = k.min(loaded.index.len().max(1));
        let result = loaded.index.search(&[query_vec], k)?;
        let hits: Vec<Hit> = result.positions[0]
            .iter()
            .zip(&result.scores[0])
            .filter_map(|(&pos, &score)| {
                if pos == SENTINEL {
                    return None;
                }
                let position = usize::try_from(pos).ok()?;
                let meta = loaded.meta.chunks.get(position)?;
                Some(Hit {
                    score,
                    text: meta.text.clone(),
                    source: meta.source.clone(),
                    chunk_id: position,
                    entity: self.scope.entity().to_string(),
                })
            })
            .collect();

        debug!(scope = %self.scope, k, hits = hits.len(), "retrieved");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::index::FlatIndex;
    use crate::store::{save_scope, ChunkMeta, MetaStore};

    async fn write_scope(storage: &Path, scope: &Scope, texts: &[&str], embedder: &EmbedderHandle) {
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed(&owned).await.unwrap();
        let index = FlatIndex::build(vectors[0].len(), &vectors).unwrap();
        let meta = MetaStore {
            dim: index.dim(),
            chunks: owned
                .into_iter()
                .enumerate()
                .map(|(i, text)| ChunkMeta {
                    text,
                    source: format!("doc{}.txt", i),
                    chunk_id: 0,
                })
                .collect(),
            model: None,
            built_at: None,
        };
        save_scope(&scope.paths(storage), &index, &meta).unwrap();
    }

    #[tokio::test]
    async fn hits_align_with_metadata() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = EmbedderHandle::new(EmbeddingConfig::hashing(128));
        let scope = Scope::Person("Ana".to_string());
        let texts = [
            "Ana has 5 years of experience",
            "Ana studied physics",
            "Ana speaks Spanish and English",
        ];
        write_scope(tmp.path(), &scope, &texts, &embedder).await;

        let retriever = Retriever::new(scope, tmp.path(), embedder, 4);
        let hits = retriever.retrieve("years of experience", None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, texts[0]);
        for hit in &hits {
            assert_eq!(hit.text, texts[hit.chunk_id]);
            assert_eq!(hit.source, format!("doc{}.txt", hit.chunk_id));
            assert_eq!(hit.entity, "Ana");
        }
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = EmbedderHandle::new(EmbeddingConfig::hashing(16));
        let retriever = Retriever::new(Scope::Global, tmp.path(), embedder, 4);
        let err = retriever.retrieve("anything", Some(0)).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn huge_top_k_returns_every_chunk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = EmbedderHandle::new(EmbeddingConfig::hashing(32));
        let scope = Scope::Person("Ana".to_string());
        write_scope(tmp.path(), &scope, &["Ana has 5 years of experience"], &embedder).await;

        let retriever = Retriever::new(scope, tmp.path(), embedder, 4);
        let hits = retriever.retrieve("years", Some(usize::MAX)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, 0);
    }

    #[tokio::test]
    async fn missing_index_does_not_touch_embedder() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = EmbedderHandle::new(EmbeddingConfig::hashing(16));
        let retriever = Retriever::new(
            Scope::Person("Luis".to_string()),
            tmp.path(),
            embedder.clone(),
            4,
        );
        let err = retriever.retrieve("anything", None).await.unwrap_err();
        assert!(err.is_index_missing());
        assert!(!embedder.is_initialized());
    }

    #[tokio::test]
    async fn reload_picks_up_rebuilt_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = EmbedderHandle::new(EmbeddingConfig::hashing(32));
        write_scope(tmp.path(), &Scope::Global, &["first"], &embedder).await;

        let retriever = Retriever::new(Scope::Global, tmp.path(), embedder.clone(), 4);
        assert_eq!(retriever.retrieve("first", None).await.unwrap().len(), 1);

        write_scope(tmp.path(), &Scope::Global, &["first", "second"], &embedder).await;
        assert_eq!(retriever.retrieve("first", None).await.unwrap().len(), 1);

        retriever.reload().await;
        assert!(!retriever.is_loaded().await);
        assert_eq!(retriever.retrieve("first", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_invalid_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let writer = EmbedderHandle::new(EmbeddingConfig::hashing(32));
        write_scope(tmp.path(), &Scope::Global, &["text"], &writer).await;

        let reader = EmbedderHandle::new(EmbeddingConfig::hashing(64));
        let retriever = Retriever::new(Scope::Global, tmp.path(), reader, 4);
        let err = retriever.retrieve("text", None).await.unwrap_err();
        assert!(matches!(err, RagError::IndexInvalid { .. }));
    }
}

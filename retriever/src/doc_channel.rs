//! The document-index retrieval channel.

use std::sync::Arc;

use async_trait::async_trait;
use maestro_core::{EmbeddingClient, Evidence};
use maestro_index::HybridIndex;

use crate::channel::{retry_with_backoff, RetrievalChannel};
use crate::error::RetrieverError;

/// Retrieves evidence from the hybrid dense+sparse chunk index.
pub struct DocChannel<E: EmbeddingClient> {
    index: Arc<HybridIndex>,
    embedder: Arc<E>,
    fusion_alpha: f32,
    max_attempts: u32,
}

impl<E: EmbeddingClient> DocChannel<E> {
    /// Creates a doc channel over `index`, embedding queries with `embedder`.
    #[must_use]
    pub fn new(index: Arc<HybridIndex>, embedder: Arc<E>, fusion_alpha: f32) -> Self {
        Self {
            index,
            embedder,
            fusion_alpha,
            max_attempts: 3,
        }
    }

    async fn embed_query(&self, query: &str) -> Result<(Vec<f32>, maestro_core::SparseVector), RetrieverError> {
        let texts = [query.to_string()];
        let dense = self
            .embedder
            .embed_dense(&texts)
            .await
            .map_err(|err| RetrieverError::Transient(err.into()))?;
        let sparse = self
            .embedder
            .embed_sparse(&texts)
            .await
            .map_err(|err| RetrieverError::Transient(err.into()))?;
        let dense_query = dense.into_iter().next().ok_or_else(|| RetrieverError::ChannelFailed {
            channel: "doc",
            source: anyhow::anyhow!("embedder returned no dense vector for query"),
        })?;
        let sparse_query = sparse.into_iter().next().unwrap_or_default();
        Ok((dense_query, sparse_query))
    }
}

#[async_trait]
impl<E: EmbeddingClient + Send + Sync + 'static> RetrievalChannel for DocChannel<E> {
    fn name(&self) -> &'static str {
        "doc"
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>, RetrieverError> {
        retry_with_backoff(self.name(), self.max_attempts, || async {
            let (dense_query, sparse_query) = self.embed_query(query).await?;
            self.index
                .search_hybrid(&dense_query, &sparse_query, top_k, self.fusion_alpha)
                .map_err(|err| RetrieverError::ChannelFailed {
                    channel: "doc",
                    source: err.into(),
                })
        })
        .await
    }
}

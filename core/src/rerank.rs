//! The [`RerankClient`] capability adapter (cross-encoder reranking).

use async_trait::async_trait;

use crate::error::Result;

/// A single rerank result: the original index into the candidate list, paired
/// with the cross-encoder's relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankScore {
    /// Index into the `docs` slice passed to [`RerankClient::rerank`].
    pub index: usize,
    /// Cross-encoder relevance score (higher is more relevant).
    pub score: f32,
}

/// Capability adapter for cross-encoder reranking of retrieved candidates.
#[async_trait]
pub trait RerankClient: Send + Sync {
    /// Scores `docs` against `query` and returns the top `k`, sorted by
    /// descending score.
    async fn rerank(&self, query: &str, docs: &[String], k: usize) -> Result<Vec<RerankScore>>;
}

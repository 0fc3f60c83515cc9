//! Dense and sparse embedding capability adapters.
//!
//! Embedding/rerank model inference is an external capability (`spec.md` §1);
//! this module only describes the `embed_dense`/`embed_sparse` shapes the
//! vector index and retriever build on.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A dense embedding vector. Implementations are expected to return
/// cosine-normalized vectors (`spec.md` §4.1).
pub type DenseVector = Vec<f32>;

/// A sparse embedding, mapping token id to weight. `BTreeMap` keeps iteration
/// order deterministic, which matters for reproducible dot-product scoring.
pub type SparseVector = BTreeMap<u32, f32>;

/// Capability adapter producing dense vectors for text.
#[async_trait]
pub trait DenseEmbeddingClient: Send + Sync {
    /// Dimensionality of vectors this client produces.
    fn dim(&self) -> usize;

    /// Embeds a batch of texts, one dense vector per input, in order.
    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<DenseVector>>;
}

/// Capability adapter producing sparse (e.g. `SPLADE`/BM25-style) vectors.
#[async_trait]
pub trait SparseEmbeddingClient: Send + Sync {
    /// Embeds a batch of texts, one sparse vector per input, in order.
    async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>>;
}

/// Convenience combinator for providers that expose both capabilities behind
/// one client, mirroring `spec.md` §6's single `EmbeddingClient` interface.
pub trait EmbeddingClient: DenseEmbeddingClient + SparseEmbeddingClient {}

impl<T> EmbeddingClient for T where T: DenseEmbeddingClient + SparseEmbeddingClient {}

/// Computes cosine similarity between two equal-length dense vectors.
///
/// Returns `0.0` for mismatched or zero-length inputs rather than panicking —
/// this is a hot path called on every index search.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Computes the dot product between two sparse vectors over their shared keys.
#[must_use]
pub fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    shorter
        .iter()
        .filter_map(|(k, v)| longer.get(k).map(|w| v * w))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn sparse_dot_over_shared_keys() {
        let mut a = SparseVector::new();
        a.insert(1, 2.0);
        a.insert(2, 3.0);
        let mut b = SparseVector::new();
        b.insert(2, 4.0);
        b.insert(3, 5.0);
        assert!((sparse_dot(&a, &b) - 12.0).abs() < 1e-6);
    }
}

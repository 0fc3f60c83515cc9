//! Sparse (token-weight) search. Brute-force dot product — sparse vectors
//! don't benefit from the ANN structure dense vectors do, and mission corpora
//! are small enough that a linear scan is not a bottleneck.

use std::collections::HashMap;

use maestro_core::embedding::sparse_dot;
use maestro_core::{ChunkId, SparseVector};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;

/// A ranked sparse search hit.
#[derive(Debug, Clone, Copy)]
pub struct SparseHit {
    /// Matching chunk id.
    pub chunk_id: ChunkId,
    /// Dot-product score.
    pub score: f32,
}

#[derive(Default)]
struct SparseState {
    vectors: HashMap<ChunkId, SparseVector>,
}

/// Sparse vector index, keyed by [`ChunkId`].
#[derive(Default)]
pub struct SparseIndex {
    state: RwLock<SparseState>,
}

impl std::fmt::Debug for SparseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseIndex")
            .field("len", &self.state.read().vectors.len())
            .finish()
    }
}

impl SparseIndex {
    /// Creates an empty sparse index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a chunk's sparse vector.
    pub fn upsert(&self, chunk_id: ChunkId, vector: SparseVector) {
        self.state.write().vectors.insert(chunk_id, vector);
    }

    /// Removes a chunk's sparse vector. Returns `true` if it was present.
    pub fn remove(&self, chunk_id: ChunkId) -> bool {
        self.state.write().vectors.remove(&chunk_id).is_some()
    }

    /// Scores every indexed vector against `query` and returns the top `top_k`.
    pub fn search(&self, query: &SparseVector, top_k: usize) -> Vec<SparseHit> {
        if top_k == 0 {
            return Vec::new();
        }
        let state = self.state.read();
        let mut hits: Vec<SparseHit> = state
            .vectors
            .iter()
            .map(|(id, vec)| SparseHit {
                chunk_id: *id,
                score: sparse_dot(query, vec),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();
        hits.sort_by_key(|h| std::cmp::Reverse(OrderedFloat(h.score)));
        hits.truncate(top_k);
        hits
    }

    /// Returns a clone of the vector stored for `chunk_id`, if present.
    #[must_use]
    pub fn vector_of(&self, chunk_id: ChunkId) -> Option<SparseVector> {
        self.state.read().vectors.get(&chunk_id).cloned()
    }

    /// Removes every vector from the index.
    pub fn clear(&self) {
        self.state.write().vectors.clear();
    }

    /// Number of vectors currently indexed.
    pub fn len(&self) -> usize {
        self.state.read().vectors.len()
    }

    /// Returns `true` if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(pairs: &[(u32, f32)]) -> SparseVector {
        pairs.iter().copied().collect()
    }

    #[test]
    fn search_ranks_by_dot_product() {
        let index = SparseIndex::new();
        let a = ChunkId::new();
        let b = ChunkId::new();
        index.upsert(a, sv(&[(1, 1.0), (2, 1.0)]));
        index.upsert(b, sv(&[(1, 0.1)]));

        let hits = index.search(&sv(&[(1, 1.0), (2, 1.0)]), 2);
        assert_eq!(hits[0].chunk_id, a);
    }

    #[test]
    fn zero_score_hits_are_excluded() {
        let index = SparseIndex::new();
        let a = ChunkId::new();
        index.upsert(a, sv(&[(5, 1.0)]));
        let hits = index.search(&sv(&[(9, 1.0)]), 10);
        assert!(hits.is_empty());
    }
}

//! Dense approximate-nearest-neighbor search backed by `instant-distance`.

use std::collections::HashMap;

use instant_distance::{Builder, HnswMap, Point, Search};
use maestro_core::ChunkId;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;

use crate::error::{IndexError, Result};

#[derive(Clone, Debug)]
struct EmbeddingPoint(Vec<f32>);

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        1.0 - maestro_core::embedding::cosine_similarity(&self.0, &other.0)
    }
}

struct DenseState {
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    id_to_slot: HashMap<ChunkId, usize>,
    hnsw: Option<HnswMap<EmbeddingPoint, usize>>,
    dirty: bool,
}

impl DenseState {
    fn new() -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            id_to_slot: HashMap::new(),
            hnsw: None,
            dirty: false,
        }
    }

    fn rebuild(&mut self) {
        if self.ids.is_empty() {
            self.hnsw = None;
            self.dirty = false;
            return;
        }
        let points: Vec<EmbeddingPoint> = self.vectors.iter().cloned().map(EmbeddingPoint).collect();
        let slots: Vec<usize> = (0..self.ids.len()).collect();
        self.hnsw = Some(Builder::default().build(points, slots));
        self.dirty = false;
    }
}

/// A ranked dense search hit.
#[derive(Debug, Clone, Copy)]
pub struct DenseHit {
    /// Matching chunk id.
    pub chunk_id: ChunkId,
    /// Cosine similarity, in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Dense vector index over a fixed embedding dimension, rebuilt lazily after
/// writes. Mirrors the HNSW-backed index the teacher's RAG crate uses, keyed
/// by [`ChunkId`] instead of a bare string.
pub struct DenseIndex {
    dimension: usize,
    state: RwLock<DenseState>,
}

impl std::fmt::Debug for DenseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DenseIndex")
            .field("dimension", &self.dimension)
            .field("len", &state.ids.len())
            .finish()
    }
}

impl DenseIndex {
    /// Creates an empty dense index for `dimension`-length vectors.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(DenseState::new()),
        }
    }

    /// Upserts a chunk's dense vector. Replaces the existing vector if
    /// `chunk_id` is already present.
    pub fn upsert(&self, chunk_id: ChunkId, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let mut state = self.state.write();
        if let Some(&slot) = state.id_to_slot.get(&chunk_id) {
            state.vectors[slot] = vector;
        } else {
            let slot = state.ids.len();
            state.ids.push(chunk_id);
            state.vectors.push(vector);
            state.id_to_slot.insert(chunk_id, slot);
        }
        state.dirty = true;
        Ok(())
    }

    /// Removes a chunk's dense vector. Returns `true` if it was present.
    pub fn remove(&self, chunk_id: ChunkId) -> bool {
        let mut state = self.state.write();
        let Some(slot) = state.id_to_slot.remove(&chunk_id) else {
            return false;
        };
        state.ids.swap_remove(slot);
        state.vectors.swap_remove(slot);
        if slot < state.ids.len() {
            let moved = state.ids[slot];
            state.id_to_slot.insert(moved, slot);
        }
        state.dirty = true;
        true
    }

    /// Returns the top `top_k` nearest neighbors of `query` by cosine similarity.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<DenseHit>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut state = self.state.write();
        if state.ids.is_empty() {
            return Ok(Vec::new());
        }
        if state.dirty || state.hnsw.is_none() {
            state.rebuild();
        }
        let Some(hnsw) = state.hnsw.as_ref() else {
            return Ok(Vec::new());
        };

        let query_point = EmbeddingPoint(query.to_vec());
        let mut search = Search::default();
        let mut hits: Vec<DenseHit> = hnsw
            .search(&query_point, &mut search)
            .take(top_k)
            .map(|candidate| DenseHit {
                chunk_id: state.ids[*candidate.value],
                score: 1.0 - candidate.distance,
            })
            .collect();
        hits.sort_by_key(|h| std::cmp::Reverse(OrderedFloat(h.score)));
        Ok(hits)
    }

    /// Returns a clone of the vector stored for `chunk_id`, if present.
    #[must_use]
    pub fn vector_of(&self, chunk_id: ChunkId) -> Option<Vec<f32>> {
        let state = self.state.read();
        let slot = *state.id_to_slot.get(&chunk_id)?;
        Some(state.vectors[slot].clone())
    }

    /// The configured embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Removes every vector from the index.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.ids.clear();
        state.vectors.clear();
        state.id_to_slot.clear();
        state.hnsw = None;
        state.dirty = false;
    }

    /// Number of vectors currently indexed.
    pub fn len(&self) -> usize {
        self.state.read().ids.len()
    }

    /// Returns `true` if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_search_returns_nearest_first() {
        let index = DenseIndex::new(2);
        let a = ChunkId::new();
        let b = ChunkId::new();
        index.upsert(a, vec![1.0, 0.0]).unwrap();
        index.upsert(b, vec![0.0, 1.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk_id, a);
    }

    #[test]
    fn remove_drops_vector() {
        let index = DenseIndex::new(2);
        let a = ChunkId::new();
        index.upsert(a, vec![1.0, 0.0]).unwrap();
        assert!(index.remove(a));
        assert!(index.is_empty());
        assert!(!index.remove(a));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = DenseIndex::new(3);
        let err = index.upsert(ChunkId::new(), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 3, actual: 2 }));
    }
}

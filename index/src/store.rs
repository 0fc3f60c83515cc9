//! [`HybridIndex`]: the combined dense+sparse chunk store.

use std::collections::HashMap;

use maestro_core::{Chunk, ChunkId, DenseVector, EmbeddedChunk, Evidence, SparseVector};
use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

use crate::dense::DenseIndex;
use crate::error::{IndexError, Result};
use crate::fusion::reciprocal_rank_fusion;
use crate::sparse::SparseIndex;

/// One fully-indexed chunk, as returned by [`HybridIndex::entries`] and
/// accepted by [`HybridIndex::load`] for snapshot restore.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexEntry {
    /// The underlying chunk, including its metadata.
    pub chunk: Chunk,
    /// The chunk's dense embedding.
    pub dense_vec: DenseVector,
    /// The chunk's sparse embedding.
    pub sparse_vec: SparseVector,
}

/// Capability summary returned by [`HybridIndex::profile`], mirroring the
/// capability-probe shape used across the workspace's adapter traits.
#[derive(Debug, Clone, Copy)]
pub struct IndexProfile {
    /// Configured dense embedding dimension.
    pub dense_dimension: usize,
    /// Number of chunks currently indexed.
    pub entry_count: usize,
    /// Always `true`; kept for symmetry with other capability profiles that
    /// may gain optional sparse support in the future.
    pub supports_sparse: bool,
}

struct HybridState {
    chunks: HashMap<ChunkId, Chunk>,
    content_hashes: HashMap<u64, ChunkId>,
}

/// A hybrid dense+sparse vector index over document chunks, with
/// content-hash deduplication and reciprocal-rank fusion search.
pub struct HybridIndex {
    dense: DenseIndex,
    sparse: SparseIndex,
    state: RwLock<HybridState>,
}

impl std::fmt::Debug for HybridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIndex")
            .field("len", &self.len())
            .finish()
    }
}

impl HybridIndex {
    /// Creates an empty index for `dense_dimension`-length dense vectors.
    #[must_use]
    pub fn new(dense_dimension: usize) -> Self {
        Self {
            dense: DenseIndex::new(dense_dimension),
            sparse: SparseIndex::new(),
            state: RwLock::new(HybridState {
                chunks: HashMap::new(),
                content_hashes: HashMap::new(),
            }),
        }
    }

    /// Inserts an embedded chunk, skipping it if its text content hash is
    /// already present (content-hash dedup). Returns `true` if the chunk was
    /// newly inserted, `false` if it was a duplicate of existing content.
    pub fn insert(&self, embedded: EmbeddedChunk) -> Result<bool> {
        let hash = xxh3_64(embedded.chunk.text.as_bytes());
        {
            let state = self.state.read();
            if state.content_hashes.contains_key(&hash) {
                return Ok(false);
            }
        }

        let chunk_id = embedded.chunk.chunk_id;
        self.dense.upsert(chunk_id, embedded.dense_vec)?;
        self.sparse.upsert(chunk_id, embedded.sparse_vec);

        let mut state = self.state.write();
        state.content_hashes.insert(hash, chunk_id);
        state.chunks.insert(chunk_id, embedded.chunk);
        Ok(true)
    }

    /// Removes a chunk from both the dense and sparse sub-indexes.
    pub fn remove(&self, chunk_id: ChunkId) -> bool {
        let dense_removed = self.dense.remove(chunk_id);
        self.sparse.remove(chunk_id);
        let mut state = self.state.write();
        if let Some(chunk) = state.chunks.remove(&chunk_id) {
            let hash = xxh3_64(chunk.text.as_bytes());
            state.content_hashes.remove(&hash);
        }
        dense_removed
    }

    /// Returns `true` if a chunk with this exact text content has already
    /// been indexed.
    #[must_use]
    pub fn contains_hash(&self, hash: u64) -> bool {
        self.state.read().content_hashes.contains_key(&hash)
    }

    /// Runs a hybrid dense+sparse search and fuses the two ranked lists via
    /// reciprocal-rank fusion, returning [`Evidence`] ready for the retriever.
    ///
    /// `alpha` weighs the dense channel against sparse (`0.5` is an even
    /// split). Each channel is over-fetched (`top_k * 4`, capped at 50) before
    /// fusion so reranking downstream has enough candidates to work with.
    pub fn search_hybrid(&self, dense_query: &[f32], sparse_query: &SparseVector, top_k: usize, alpha: f32) -> Result<Vec<Evidence>> {
        let fetch_k = (top_k.saturating_mul(4)).clamp(top_k, 50);
        let dense_hits = self.dense.search(dense_query, fetch_k)?;
        let sparse_hits = self.sparse.search(sparse_query, fetch_k);
        let fused = reciprocal_rank_fusion(&dense_hits, &sparse_hits, alpha);

        let state = self.state.read();
        let evidence = fused
            .into_iter()
            .take(top_k)
            .filter_map(|hit| {
                let chunk = state.chunks.get(&hit.chunk_id)?;
                Some(Evidence::from_chunk(hit.chunk_id, chunk.doc_id, chunk.text.clone(), hit.score))
            })
            .collect();
        Ok(evidence)
    }

    /// Snapshots every indexed chunk plus its vectors, for persistence.
    #[must_use]
    pub fn entries(&self) -> Vec<IndexEntry> {
        let state = self.state.read();
        state
            .chunks
            .iter()
            .filter_map(|(chunk_id, chunk)| {
                let dense_vec = self.dense.vector_of(*chunk_id)?;
                let sparse_vec = self.sparse.vector_of(*chunk_id).unwrap_or_default();
                Some(IndexEntry {
                    chunk: chunk.clone(),
                    dense_vec,
                    sparse_vec,
                })
            })
            .collect()
    }

    /// Replaces the index's contents with `entries`, e.g. after restoring a
    /// persisted snapshot. Rejects duplicate chunk ids within the snapshot
    /// itself (dedup-by-hash does not apply here; a snapshot is expected to
    /// already be deduplicated).
    pub fn load(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.chunk.chunk_id) {
                return Err(IndexError::DuplicateChunk(entry.chunk.chunk_id.to_string()));
            }
        }

        self.dense.clear();
        self.sparse.clear();
        self.state.write().chunks.clear();
        self.state.write().content_hashes.clear();
        for entry in entries {
            let embedded = EmbeddedChunk {
                chunk: entry.chunk,
                dense_vec: entry.dense_vec,
                sparse_vec: entry.sparse_vec,
            };
            self.insert(embedded)?;
        }
        Ok(())
    }

    /// Number of chunks currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().chunks.len()
    }

    /// Returns `true` if the index holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports the index's current capabilities and size.
    #[must_use]
    pub fn profile(&self) -> IndexProfile {
        IndexProfile {
            dense_dimension: self.dense.dimension(),
            entry_count: self.len(),
            supports_sparse: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use maestro_core::Metadata;

    use super::*;

    fn chunk(text: &str) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                chunk_id: ChunkId::new(),
                doc_id: maestro_core::DocId::new(),
                ord: 0,
                text: text.to_string(),
                metadata: Metadata::new(),
            },
            dense_vec: vec![1.0, 0.0],
            sparse_vec: [(1, 1.0)].into_iter().collect(),
        }
    }

    #[test]
    fn duplicate_content_is_skipped() {
        let index = HybridIndex::new(2);
        assert!(index.insert(chunk("same text")).unwrap());
        assert!(!index.insert(chunk("same text")).unwrap());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_clears_both_sub_indexes() {
        let index = HybridIndex::new(2);
        let embedded = chunk("hello");
        let id = embedded.chunk.chunk_id;
        index.insert(embedded).unwrap();
        assert!(index.remove(id));
        assert!(index.is_empty());
    }

    #[test]
    fn hybrid_search_returns_doc_evidence() {
        let index = HybridIndex::new(2);
        index.insert(chunk("alpha")).unwrap();
        let sparse_query: SparseVector = [(1, 1.0)].into_iter().collect();
        let results = index.search_hybrid(&[1.0, 0.0], &sparse_query, 5, 0.5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "alpha");
    }
}

//! The [`DocumentStore`] capability adapter: a read-only view of chunks
//! produced by the (out-of-scope) document-ingestion pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::{DenseVector, SparseVector};
use crate::error::Result;
use crate::ids::{ChunkId, DocId};

/// Arbitrary key/value metadata carried by a chunk (e.g. `source_url`,
/// `page_number`, `document_group_id`).
pub type Metadata = BTreeMap<String, String>;

/// A chunk of ingested document text, as produced by the external ingestion
/// collaborator and consumed read-only by the vector index and retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier for this chunk.
    pub chunk_id: ChunkId,
    /// The document this chunk was extracted from.
    pub doc_id: DocId,
    /// Position of this chunk within its parent document.
    pub ord: u32,
    /// Raw chunk text.
    pub text: String,
    /// Inherited document metadata plus chunk-specific keys.
    pub metadata: Metadata,
}

/// An indexed chunk: the chunk plus the vectors computed for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// The underlying chunk.
    pub chunk: Chunk,
    /// Cosine-normalized dense embedding.
    pub dense_vec: DenseVector,
    /// Sparse embedding (token id -> weight).
    pub sparse_vec: SparseVector,
}

/// A filter applied when listing chunks from a [`DocumentStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkFilter {
    /// Restrict to chunks belonging to this document group, if set.
    pub document_group_id: Option<String>,
    /// Restrict to chunks whose metadata matches all of these key/value pairs.
    pub metadata_equals: Metadata,
}

impl ChunkFilter {
    /// Returns `true` if `metadata` satisfies this filter.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        if let Some(group) = &self.document_group_id {
            if metadata.get("document_group_id") != Some(group) {
                return false;
            }
        }
        self.metadata_equals
            .iter()
            .all(|(k, v)| metadata.get(k) == Some(v))
    }
}

/// Capability adapter: a read-only view over ingested document chunks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns up to `limit` chunks matching `filter`.
    async fn get_chunks_by_filter(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<Chunk>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_empty_filter() {
        let filter = ChunkFilter::default();
        assert!(filter.matches(&Metadata::new()));
    }

    #[test]
    fn filter_rejects_mismatched_group() {
        let mut filter = ChunkFilter::default();
        filter.document_group_id = Some("group-a".into());
        let mut meta = Metadata::new();
        meta.insert("document_group_id".into(), "group-b".into());
        assert!(!filter.matches(&meta));
    }

    #[test]
    fn filter_requires_all_metadata_keys() {
        let mut filter = ChunkFilter::default();
        filter.metadata_equals.insert("lang".into(), "en".into());
        filter.metadata_equals.insert("kind".into(), "pdf".into());
        let mut meta = Metadata::new();
        meta.insert("lang".into(), "en".into());
        assert!(!filter.matches(&meta));
        meta.insert("kind".into(), "pdf".into());
        assert!(filter.matches(&meta));
    }
}

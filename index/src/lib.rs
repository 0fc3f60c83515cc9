//! # maestro-index
//!
//! A hybrid dense+sparse vector index over document chunks, with
//! content-hash deduplication and reciprocal-rank fusion search. The dense
//! side is an approximate nearest-neighbor graph (`instant-distance`); the
//! sparse side is an exact linear scan, since sparse corpora per mission are
//! small and don't benefit from an ANN structure.
//!
//! This crate knows nothing about missions or retrieval strategy — it is a
//! single in-process store keyed by [`maestro_core::ChunkId`]. Federating
//! this index with the web-search channel and turning its output into
//! cited [`maestro_core::Evidence`] is `maestro-retriever`'s job.

pub mod dense;
pub mod error;
pub mod fusion;
pub mod sparse;
pub mod store;

pub use dense::{DenseHit, DenseIndex};
pub use error::{IndexError, Result};
pub use fusion::{reciprocal_rank_fusion, FusedHit};
pub use sparse::{SparseHit, SparseIndex};
pub use store::{HybridIndex, IndexEntry, IndexProfile};

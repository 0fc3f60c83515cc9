//! # maestro-core
//!
//! Capability-adapter trait abstractions for the MAESTRO mission engine.
//!
//! Everything in this crate is a façade: `LLMClient`, `DenseEmbeddingClient` /
//! `SparseEmbeddingClient`, `RerankClient`, `WebSearchClient`, and
//! `DocumentStore` describe the shape of external capabilities the rest of the
//! workspace consumes, never the capabilities themselves (inference, web
//! providers, and ingestion are explicitly out of scope — see `spec.md` §1).
//!
//! Downstream crates depend on these traits generically (`impl LLMClient`) or
//! through `Arc<dyn LLMClient>` when a mission needs to select a concrete
//! adapter at runtime based on its frozen `settings_snapshot`.

pub mod documents;
pub mod embedding;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod llm;
pub mod rerank;
pub mod settings;
pub mod websearch;

pub use documents::{Chunk, ChunkFilter, DocumentStore, EmbeddedChunk, Metadata};
pub use embedding::{DenseEmbeddingClient, DenseVector, EmbeddingClient, SparseEmbeddingClient, SparseVector};
pub use error::{CapabilityError, Result};
pub use evidence::{Evidence, Provenance, ProvenanceKind};
pub use ids::{ChunkId, DocId, GoalId, LogId, MissionId, NoteId, OutlineHistoryId, ReportVersionId, SectionId, ThoughtId};
pub use llm::{Completion, CompletionParams, LLMClient, ModelRole, TokenUsage};
pub use rerank::{RerankClient, RerankScore};
pub use settings::{MissionSettings, ModelBinding, SearchProviderName, SETTINGS_VERSION};
pub use websearch::{FetchedPage, WebSearchClient, WebSearchHit};

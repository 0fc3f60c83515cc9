//! [`Evidence`]: the ephemeral retrieval-result type shared by the vector
//! index, the retriever, and the research agent. Never persisted — it is
//! produced fresh per query and either discarded or promoted into a `Note`
//! by an agent.

use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, DocId};

/// Where a piece of [`Evidence`] came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Which retrieval channel produced this evidence.
    pub kind: ProvenanceKind,
    /// Source document id, for `doc`-kind evidence.
    pub doc_id: Option<DocId>,
    /// Source chunk id, for `doc`-kind evidence.
    pub chunk_id: Option<ChunkId>,
    /// Source URL, for `web`-kind evidence.
    pub url: Option<String>,
    /// Page or document title, when known.
    pub title: Option<String>,
}

/// Which channel produced a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceKind {
    /// Retrieved from the hybrid dense+sparse vector index.
    Doc,
    /// Retrieved via web search and/or fetch.
    Web,
    /// Produced internally by an agent (not externally sourced).
    Internal,
}

/// A single retrieval result. Ephemeral — never persisted directly (see
/// `spec.md` §3, "Evidence (ephemeral)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Opaque identifier unique within the query that produced this evidence
    /// (e.g. `chunk_id` for doc evidence, the URL for web evidence). Used as
    /// the `[E_i]` inline marker target by the Researcher.
    pub source_id: String,
    /// Evidence text (chunk text, snippet, or fetched body excerpt).
    pub text: String,
    /// Relevance score, channel-normalized before fusion.
    pub score: f32,
    /// Where this evidence came from.
    pub provenance: Provenance,
}

impl Evidence {
    /// Builds document-channel evidence from a chunk id/text/score triple.
    #[must_use]
    pub fn from_chunk(
        chunk_id: ChunkId,
        doc_id: DocId,
        text: impl Into<String>,
        score: f32,
    ) -> Self {
        Self {
            source_id: chunk_id.to_string(),
            text: text.into(),
            score,
            provenance: Provenance {
                kind: ProvenanceKind::Doc,
                doc_id: Some(doc_id),
                chunk_id: Some(chunk_id),
                url: None,
                title: None,
            },
        }
    }

    /// Builds web-channel evidence from a URL/title/snippet triple.
    #[must_use]
    pub fn from_web(url: impl Into<String>, title: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        let url = url.into();
        Self {
            source_id: url.clone(),
            text: text.into(),
            score,
            provenance: Provenance {
                kind: ProvenanceKind::Web,
                doc_id: None,
                chunk_id: None,
                url: Some(url),
                title: Some(title.into()),
            },
        }
    }
}

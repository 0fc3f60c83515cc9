//! The request shape accepted by [`crate::executor::RetrieverExecutor`].

use serde::{Deserialize, Serialize};

/// Which retrieval channels a request should fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// The hybrid dense+sparse document index.
    Doc,
    /// Web search plus page fetch.
    Web,
}

/// A single federated retrieval request, issued by a Researcher agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Natural-language query text.
    pub query: String,
    /// Maximum evidence items to return, across all channels combined.
    pub top_k: usize,
    /// Channels to query. Running the same kind twice is harmless but wasteful.
    pub channels: Vec<ChannelKind>,
    /// Dense/sparse fusion weight, forwarded to the hybrid index. Ignored by
    /// the web channel.
    pub fusion_alpha: f32,
}

impl RetrievalRequest {
    /// Builds a request that queries both channels with an even fusion
    /// weight, the common case for a Researcher's first pass at a sub-goal.
    #[must_use]
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            channels: vec![ChannelKind::Doc, ChannelKind::Web],
            fusion_alpha: 0.5,
        }
    }

    /// Restricts the request to a single channel.
    #[must_use]
    pub fn only(mut self, channel: ChannelKind) -> Self {
        self.channels = vec![channel];
        self
    }
}

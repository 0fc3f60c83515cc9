//! Fan-out across retrieval channels with per-channel retry already applied.

use std::sync::Arc;

use maestro_core::{Evidence, RerankClient};

use crate::channel::RetrievalChannel;
use crate::error::{Result, RetrieverError};
use crate::request::{ChannelKind, RetrievalRequest};

fn channel_name(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Doc => "doc",
        ChannelKind::Web => "web",
    }
}

/// Capabilities the registered channels give this executor, so an agent can
/// skip a channel it knows is structurally disabled rather than discovering
/// that via a [`RetrieverError::NoEvidence`] round-trip.
#[derive(Clone, Debug)]
pub struct RetrieverProfile {
    /// Whether a `"web"` channel is registered.
    pub supports_web: bool,
    /// Whether a `"doc"` channel is registered.
    pub supports_rag: bool,
}

/// Runs a [`RetrievalRequest`] against a fixed set of channels, merging their
/// results and surfacing [`RetrieverError::NoEvidence`] only when every
/// requested channel failed or came back empty.
///
/// When a [`RerankClient`] is configured, the merged evidence is reranked
/// against the query text before truncation (`spec.md` §4.1's "optionally
/// reranks with a cross-encoder"); a reranker failure just falls back to the
/// channels' own scores rather than failing the whole request.
pub struct RetrieverExecutor {
    channels: Vec<Arc<dyn RetrievalChannel>>,
    reranker: Option<Arc<dyn RerankClient>>,
}

impl RetrieverExecutor {
    /// Builds an executor over the given channels with no reranking stage.
    /// Channel selection at query time is by name (`"doc"`, `"web"`), so at
    /// most one channel per kind should be registered.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn RetrievalChannel>>) -> Self {
        Self { channels, reranker: None }
    }

    /// Builds an executor that reranks merged evidence through `reranker`
    /// before truncating to `top_k`.
    #[must_use]
    pub fn with_reranker(channels: Vec<Arc<dyn RetrievalChannel>>, reranker: Arc<dyn RerankClient>) -> Self {
        Self { channels, reranker: Some(reranker) }
    }

    /// Reports which channel kinds this executor can actually serve.
    #[must_use]
    pub fn profile(&self) -> RetrieverProfile {
        RetrieverProfile {
            supports_web: self.channels.iter().any(|c| c.name() == channel_name(ChannelKind::Web)),
            supports_rag: self.channels.iter().any(|c| c.name() == channel_name(ChannelKind::Doc)),
        }
    }

    /// Runs `request` across every channel it names, in parallel, fuses
    /// their evidence by descending score, optionally reranks, and truncates
    /// to `request.top_k`.
    pub async fn execute(&self, request: &RetrievalRequest) -> Result<Vec<Evidence>> {
        let wanted: Vec<&'static str> = request.channels.iter().copied().map(channel_name).collect();
        let selected: Vec<&Arc<dyn RetrievalChannel>> = self.channels.iter().filter(|c| wanted.contains(&c.name())).collect();

        let futures = selected.iter().map(|channel| {
            let channel = Arc::clone(channel);
            let query = request.query.clone();
            let top_k = request.top_k;
            async move { (channel.name(), channel.retrieve(&query, top_k).await) }
        });

        let results = futures::future::join_all(futures).await;

        let mut merged = Vec::new();
        let mut any_succeeded = false;
        for (name, outcome) in results {
            match outcome {
                Ok(evidence) => {
                    any_succeeded = true;
                    merged.extend(evidence);
                }
                Err(err) => {
                    tracing::error!(channel = name, error = %err, "retrieval channel failed after retries");
                }
            }
        }

        if !any_succeeded || merged.is_empty() {
            return Err(RetrieverError::NoEvidence);
        }

        if let Some(reranker) = &self.reranker {
            self.rerank_in_place(reranker.as_ref(), &request.query, &mut merged).await;
        } else {
            merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        }
        merged.truncate(request.top_k);
        Ok(merged)
    }

    async fn rerank_in_place(&self, reranker: &dyn RerankClient, query: &str, merged: &mut Vec<Evidence>) {
        let docs: Vec<String> = merged.iter().map(|e| e.text.clone()).collect();
        match reranker.rerank(query, &docs, merged.len()).await {
            Ok(scores) => {
                let reordered: Vec<Evidence> = scores
                    .into_iter()
                    .filter_map(|s| merged.get(s.index).cloned().map(|mut e| {
                        e.score = s.score;
                        e
                    }))
                    .collect();
                *merged = reordered;
            }
            Err(err) => {
                tracing::warn!(error = %err, "reranker failed, falling back to channel scores");
                merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct FixedChannel {
        name: &'static str,
        evidence: Vec<Evidence>,
    }

    #[async_trait]
    impl RetrievalChannel for FixedChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn retrieve(&self, _query: &str, _top_k: usize) -> std::result::Result<Vec<Evidence>, RetrieverError> {
            Ok(self.evidence.clone())
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl RetrievalChannel for FailingChannel {
        fn name(&self) -> &'static str {
            "web"
        }

        async fn retrieve(&self, _query: &str, _top_k: usize) -> std::result::Result<Vec<Evidence>, RetrieverError> {
            Err(RetrieverError::ChannelFailed { channel: "web", source: anyhow::anyhow!("boom") })
        }
    }

    fn evidence(score: f32) -> Evidence {
        Evidence::from_web("https://example.com", "title", "text", score)
    }

    #[tokio::test]
    async fn merges_and_ranks_across_channels() {
        let doc = Arc::new(FixedChannel { name: "doc", evidence: vec![evidence(0.3)] });
        let web = Arc::new(FixedChannel { name: "web", evidence: vec![evidence(0.9)] });
        let executor = RetrieverExecutor::new(vec![doc, web]);

        let request = RetrievalRequest::new("query", 10);
        let results = executor.execute(&request).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn partial_failure_still_returns_surviving_evidence() {
        let doc_ok = Arc::new(FixedChannel { name: "doc", evidence: vec![evidence(0.5)] });
        let web_failing = Arc::new(FailingChannel);
        let executor = RetrieverExecutor::new(vec![doc_ok, web_failing]);
        let request = RetrievalRequest::new("query", 10);
        let results = executor.execute(&request).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn all_channels_failing_yields_no_evidence() {
        let executor = RetrieverExecutor::new(vec![Arc::new(FailingChannel)]);
        let request = RetrievalRequest::new("query", 10).only(crate::request::ChannelKind::Web);
        let err = executor.execute(&request).await.unwrap_err();
        assert!(matches!(err, RetrieverError::NoEvidence));
    }
}

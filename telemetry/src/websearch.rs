//! [`CostTrackingWebSearchClient`]: a [`WebSearchClient`] decorator that
//! counts every search issued against a mission's running stats.

use std::sync::Arc;

use async_trait::async_trait;
use maestro_bus::{EventBus, Topic};
use maestro_context::{MissionStats, MissionContextStore};
use maestro_core::{FetchedPage, MissionId, Result, WebSearchClient, WebSearchHit};

/// Wraps a [`WebSearchClient`] so every `search` call increments
/// `mission.stats.web_searches`. `fetch` is page retrieval, not a search, and
/// is passed through untouched.
pub struct CostTrackingWebSearchClient<W> {
    inner: W,
    context: Arc<MissionContextStore>,
    bus: Arc<EventBus>,
    mission_id: MissionId,
}

impl<W: WebSearchClient> CostTrackingWebSearchClient<W> {
    /// Wraps `inner`, metering every search against `mission_id`.
    #[must_use]
    pub fn new(inner: W, context: Arc<MissionContextStore>, bus: Arc<EventBus>, mission_id: MissionId) -> Self {
        Self { inner, context, bus, mission_id }
    }
}

#[async_trait]
impl<W: WebSearchClient> WebSearchClient for CostTrackingWebSearchClient<W> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSearchHit>> {
        let result = self.inner.search(query, k).await;
        if result.is_ok() {
            let delta = MissionStats { web_searches: 1, ..MissionStats::default() };
            self.context.record_stats(self.mission_id, delta).await;
            if let Ok(snapshot) = self.context.snapshot(self.mission_id).await {
                self.bus.publish(self.mission_id, Topic::Status, &snapshot.stats);
            }
        }
        result
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch;

    #[async_trait]
    impl WebSearchClient for FixedSearch {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<WebSearchHit>> {
            Ok(vec![WebSearchHit { url: "https://example.com".into(), title: "Example".into(), snippet: "snippet".into() }])
        }

        async fn fetch(&self, _url: &str) -> Result<FetchedPage> {
            Ok(FetchedPage { text: "body".into(), title: None })
        }
    }

    #[tokio::test]
    async fn search_increments_web_searches_but_fetch_does_not() {
        let context = Arc::new(MissionContextStore::new());
        let bus = Arc::new(EventBus::new(16));
        let mission_id = MissionId::new();
        context.create_mission(mission_id, "query").await;

        let tracked = CostTrackingWebSearchClient::new(FixedSearch, Arc::clone(&context), Arc::clone(&bus), mission_id);
        tracked.search("rust async", 5).await.unwrap();
        tracked.fetch("https://example.com").await.unwrap();

        let snapshot = context.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.stats.web_searches, 1);
    }
}

//! The web-search retrieval channel.

use std::sync::Arc;

use async_trait::async_trait;
use maestro_core::{Evidence, WebSearchClient};

use crate::channel::{retry_with_backoff, RetrievalChannel};
use crate::error::RetrieverError;

/// Caps how many search hits get a full page fetch, independent of `top_k`.
/// Fetching every hit's full body is expensive and most of the signal lives
/// in the first handful of results.
const MAX_FETCHES_PER_QUERY: usize = 5;

/// Retrieves evidence by searching the web and fetching the most promising
/// hits' full text.
pub struct WebChannel {
    client: Arc<dyn WebSearchClient>,
    max_attempts: u32,
}

impl WebChannel {
    /// Creates a web channel over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn WebSearchClient>) -> Self {
        Self { client, max_attempts: 3 }
    }
}

#[async_trait]
impl RetrievalChannel for WebChannel {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>, RetrieverError> {
        retry_with_backoff(self.name(), self.max_attempts, || async {
            let hits = self
                .client
                .search(query, top_k)
                .await
                .map_err(|err| RetrieverError::Transient(err.into()))?;

            let fetch_count = hits.len().min(MAX_FETCHES_PER_QUERY);
            let mut evidence = Vec::with_capacity(hits.len());
            for hit in hits.iter().take(fetch_count) {
                match self.client.fetch(&hit.url).await {
                    Ok(page) => evidence.push(Evidence::from_web(&hit.url, page.title.as_deref().unwrap_or(&hit.title), page.text, 1.0)),
                    Err(err) => {
                        tracing::warn!(url = %hit.url, error = %err, "failed to fetch page body, falling back to snippet");
                        evidence.push(Evidence::from_web(&hit.url, &hit.title, &hit.snippet, 0.5));
                    }
                }
            }
            for hit in hits.iter().skip(fetch_count) {
                evidence.push(Evidence::from_web(&hit.url, &hit.title, &hit.snippet, 0.25));
            }

            Ok(evidence)
        })
        .await
    }
}

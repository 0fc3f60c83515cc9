//! The [`WebSearchClient`] capability adapter.
//!
//! Grounded on `aither-websearch`'s `SearchProvider` trait
//! (`tools/websearch/src/lib.rs`) and `aither-webfetch`'s `fetch` function
//! (`tools/webfetch/src/lib.rs`), collapsed into the single `search` +
//! `fetch` shape `spec.md` §6 asks for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One hit from [`WebSearchClient::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchHit {
    /// Result URL.
    pub url: String,
    /// Result title.
    pub title: String,
    /// Search-engine snippet (not the full page body).
    pub snippet: String,
}

/// The full text of a fetched page, as returned by [`WebSearchClient::fetch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Extracted body text (markdown-ish; the adapter owns cleanup).
    pub text: String,
    /// Page title, when the fetcher could determine one.
    pub title: Option<String>,
}

/// Capability adapter for web search and page retrieval.
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    /// Searches the web for `query`, returning at most `k` hits.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSearchHit>>;

    /// Fetches and extracts the body text of `url`.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

#[async_trait]
impl<T: WebSearchClient + ?Sized> WebSearchClient for std::sync::Arc<T> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSearchHit>> {
        (**self).search(query, k).await
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        (**self).fetch(url).await
    }
}

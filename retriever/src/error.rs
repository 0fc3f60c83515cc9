//! Errors raised while federating a retrieval request across channels.

use thiserror::Error;

/// Errors from a single retrieval channel or from the federated executor.
#[derive(Debug, Error)]
pub enum RetrieverError {
    /// A channel failed but may succeed on retry (rate limit, timeout,
    /// connection reset).
    #[error("transient retrieval failure: {0}")]
    Transient(#[source] anyhow::Error),

    /// A channel failed in a way retrying will not fix (bad query, auth
    /// failure, malformed configuration).
    #[error("retrieval channel '{channel}' failed: {source}")]
    ChannelFailed {
        /// Name of the channel that failed (`"doc"`, `"web"`, ...).
        channel: &'static str,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },

    /// Every channel in the request either failed or returned nothing.
    #[error("no evidence could be retrieved for this query")]
    NoEvidence,
}

/// Result type alias for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

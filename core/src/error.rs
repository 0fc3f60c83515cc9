//! Error type shared by every capability adapter trait in this crate.

use thiserror::Error;

/// An error surfaced by a capability adapter (LLM, embedding, rerank, web
/// search, or document store).
///
/// Adapters are thin façades over external services, so most failures are
/// opaque by nature; the controller (in `maestro-controller`) is responsible
/// for classifying these into the spec's transient/validation/budget/fatal
/// taxonomy, not this crate.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The underlying provider call failed (network, auth, rate limit, 5xx).
    #[error("provider call failed: {0}")]
    Provider(#[source] anyhow::Error),

    /// The call exceeded its deadline.
    #[error("capability call timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the deadline fired.
        elapsed_ms: u64,
    },

    /// The provider returned a response that could not be parsed into the
    /// expected shape.
    #[error("malformed response from provider: {0}")]
    MalformedResponse(String),

    /// No channel was enabled, or every enabled channel failed.
    #[error("no evidence could be retrieved: all channels disabled or failed")]
    NoEvidence,
}

/// Result alias used by capability adapter traits.
pub type Result<T> = std::result::Result<T, CapabilityError>;

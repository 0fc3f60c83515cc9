//! # maestro-retriever
//!
//! Federates a query across the document index and web search, retrying
//! transient per-channel failures with jittered backoff before giving up on
//! that channel, and only failing the whole request
//! ([`RetrieverError::NoEvidence`]) when every channel comes back empty.

pub mod channel;
pub mod doc_channel;
pub mod error;
pub mod executor;
pub mod request;
pub mod web_channel;

pub use channel::{retry_with_backoff, RetrievalChannel};
pub use doc_channel::DocChannel;
pub use error::{Result, RetrieverError};
pub use executor::{RetrieverExecutor, RetrieverProfile};
pub use request::{ChannelKind, RetrievalRequest};
pub use web_channel::WebChannel;

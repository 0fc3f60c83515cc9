//! Errors raised by the hybrid index.

use thiserror::Error;

/// Errors that can occur while inserting into or searching the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimensionality didn't match the index's configured dimension.
    #[error("dense vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A snapshot passed to `load` referenced the same chunk id twice.
    #[error("duplicate chunk id in snapshot: {0}")]
    DuplicateChunk(String),
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

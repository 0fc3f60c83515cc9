//! Errors raised by the persistence gateway.

use maestro_core::MissionId;
use thiserror::Error;

/// Errors from the relational persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The underlying database call failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row referenced a mission that doesn't exist.
    #[error("unknown mission: {0}")]
    UnknownMission(MissionId),

    /// A stored id or enum column held a value that didn't round-trip.
    #[error("malformed row in {table}: {detail}")]
    MalformedRow {
        /// Table the malformed row came from.
        table: &'static str,
        /// What was wrong with it.
        detail: String,
    },
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

//! Errors raised by the mission context store.

use maestro_core::{MissionId, SectionId};
use thiserror::Error;

/// Errors raised while reading or mutating a mission's working state.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No mission with this id has been loaded or created.
    #[error("unknown mission: {0}")]
    UnknownMission(MissionId),

    /// A note or snapshot referenced a section that doesn't exist in the
    /// current outline.
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),

    /// The write-behind persistence flush failed.
    #[error("failed to flush context writes for mission {mission_id}: {source}")]
    FlushFailed {
        /// Mission whose pending writes failed to flush.
        mission_id: MissionId,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

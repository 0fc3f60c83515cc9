//! [`ControllerError`]: the taxonomy every agent-level failure is classified
//! into before it can affect a mission's lifecycle.

use maestro_core::MissionId;
use maestro_context::MissionStatus;
use thiserror::Error;

/// Errors raised by [`crate::MissionController`].
///
/// Agent failures (`maestro_agents::AgentError`) never reach a caller
/// directly; [`crate::controller::classify`] sorts them into one of the
/// variants below first.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No mission with this id is known to the controller.
    #[error("mission {mission_id} not found")]
    UnknownMission {
        /// The mission that was looked up.
        mission_id: MissionId,
    },

    /// The request doesn't apply to the mission's current status (e.g.
    /// `resume` on a mission that is still `running`).
    #[error("mission {mission_id} is {status:?}, which does not accept this request")]
    InvalidTransition {
        /// The mission the request targeted.
        mission_id: MissionId,
        /// The mission's status at the time of the request.
        status: MissionStatus,
    },

    /// A capability call kept failing after every retry. The mission is
    /// moved to `failed`.
    #[error("transient failure in {agent}, exhausted retries: {detail}")]
    Transient {
        /// Which agent's capability call failed.
        agent: &'static str,
        /// The last failure's detail.
        detail: String,
    },

    /// An agent produced an artefact that stayed invalid even after its own
    /// repair attempts. The step is skipped and the mission continues.
    #[error("{agent} produced an invalid artefact: {detail}")]
    Validation {
        /// Which agent failed validation.
        agent: &'static str,
        /// The validator's last complaint.
        detail: String,
    },

    /// A resource ceiling was hit (no evidence available, iteration budget
    /// exhausted). Non-fatal: the mission advances to its next phase instead
    /// of retrying.
    #[error("budget exhausted: {detail}")]
    Budget {
        /// What ran out.
        detail: String,
    },

    /// The mission was cancelled cooperatively. Not an error condition by
    /// itself; surfaced so callers can distinguish it from a genuine failure.
    #[error("mission {mission_id} was cancelled")]
    Cancelled {
        /// The mission that was cancelled.
        mission_id: MissionId,
    },

    /// An unrecoverable error. The mission is moved to `failed`.
    #[error("fatal error in {agent}: {source}")]
    Fatal {
        /// Which agent (or controller stage) raised the error.
        agent: &'static str,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ControllerError>;

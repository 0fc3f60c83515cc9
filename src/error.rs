//! [`EngineError`]: the façade's own error type, wrapping every subcrate
//! error a caller might see through [`crate::MaestroEngine`].

use maestro_core::MissionId;
use thiserror::Error;

/// Errors raised by [`crate::MaestroEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// A lifecycle request failed against the mission controller.
    #[error(transparent)]
    Controller(#[from] maestro_controller::ControllerError),

    /// A relational read or write failed.
    #[error(transparent)]
    Persistence(#[from] maestro_persistence::PersistenceError),

    /// A working-state read failed.
    #[error(transparent)]
    Context(#[from] maestro_context::ContextError),

    /// Engine configuration could not be loaded.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// A settings snapshot could not be (de)serialized.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// A report was requested for a mission that hasn't rendered one yet.
    #[error("mission {0} has no report yet")]
    NoReport(MissionId),
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, EngineError>;

//! Errors raised by the agent pipeline.

use thiserror::Error;

/// Errors raised while running a Planner, Researcher, Reflector, Writer, or
/// Messenger step.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The underlying capability adapter (LLM, embedding, retriever) failed.
    #[error("capability call failed in {agent}: {source}")]
    Capability {
        /// Which agent was running when the call failed.
        agent: &'static str,
        /// Underlying cause.
        #[source]
        source: maestro_core::CapabilityError,
    },

    /// Federated evidence retrieval failed.
    #[error("retrieval failed in {agent}: {source}")]
    Retrieval {
        /// Which agent issued the retrieval request.
        agent: &'static str,
        /// Underlying cause.
        #[source]
        source: maestro_retriever::RetrieverError,
    },

    /// An agent produced an artefact that failed validation even after every
    /// repair attempt was exhausted.
    #[error("{agent} produced an invalid artefact after {attempts} attempt(s): {detail}")]
    Validation {
        /// Which agent failed.
        agent: &'static str,
        /// Repair attempts made, including the first.
        attempts: u32,
        /// The validator's last complaint.
        detail: String,
    },
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

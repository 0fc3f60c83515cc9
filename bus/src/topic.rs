//! The fixed set of topics a mission publishes progress on.

use serde::{Deserialize, Serialize};

/// A progress channel within a single mission. Every mission has exactly one
/// ring buffer per topic, created lazily on first publish or subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Mission lifecycle/state transitions.
    Status,
    /// Append-only log lines.
    Logs,
    /// Outline/plan updates.
    Plan,
    /// New or revised notes.
    Notes,
    /// Incremental report draft updates.
    Draft,
    /// Scratchpad/goal/thought updates (the mission's working context).
    Context,
}

impl Topic {
    /// All topics, in the fixed order the engine publishes them in.
    pub const ALL: [Topic; 6] = [Topic::Status, Topic::Logs, Topic::Plan, Topic::Notes, Topic::Draft, Topic::Context];
}

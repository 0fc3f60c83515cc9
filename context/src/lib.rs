//! # maestro-context
//!
//! A mission's working state while it runs: the outline tree and its
//! history, notes, the goal and thought pads, the scratchpad, logs, and
//! every rendered report version. [`MissionContextStore`] is the single
//! place agents read and write this state through — a per-mission lock
//! keeps concurrent writers on the same mission serialized without
//! contending with unrelated missions.
//!
//! Persistence is write-behind and optional: mutations always land in memory
//! immediately and are queued as [`ContextOp`]s for a [`ContextWriter`] (see
//! `maestro-persistence`) to flush in batches, so a slow database never
//! blocks an agent mid-turn.

pub mod error;
pub mod state;
pub mod store;
pub mod types;
pub mod writer;

pub use error::{ContextError, Result};
pub use state::MissionState;
pub use store::MissionContextStore;
pub use types::{
    GoalEntry, GoalStatus, LogEntry, LogLevel, MissionStats, MissionStatus, Note, OutlineHistoryEntry, ReportVersion, ResearchStrategy,
    Section, ThoughtEntry,
};
pub use writer::{ContextOp, ContextWriter};

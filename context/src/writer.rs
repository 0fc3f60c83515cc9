//! Write-behind persistence hook: [`MissionContextStore`] mutates its
//! in-memory state synchronously and queues the same change as a
//! [`ContextOp`] for a [`ContextWriter`] to persist in batches, so a slow
//! database never blocks an agent mid-turn.
//!
//! `maestro-persistence` implements [`ContextWriter`] over its relational
//! gateway; this crate only defines the seam.

use async_trait::async_trait;
use maestro_core::MissionId;
use serde::{Deserialize, Serialize};

use crate::types::{GoalEntry, LogEntry, MissionStats, MissionStatus, Note, OutlineHistoryEntry, ReportVersion, ThoughtEntry};

/// A single mutation to a mission's context, queued for write-behind
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContextOp {
    /// A note was appended.
    AppendNote(Note),
    /// A log line was appended.
    AppendLog(LogEntry),
    /// A thought was appended.
    AppendThought(ThoughtEntry),
    /// A goal was inserted or updated.
    UpsertGoal(GoalEntry),
    /// The scratchpad was replaced wholesale.
    SetScratchpad(String),
    /// A new outline snapshot was recorded.
    SnapshotOutline(OutlineHistoryEntry),
    /// A new report version was rendered.
    SaveReportVersion(ReportVersion),
    /// The mission's status changed.
    UpdateStatus(MissionStatus),
    /// A telemetry delta to fold additively into the mission's running
    /// stats. Never a full replacement.
    RecordStats(MissionStats),
}

/// Persists batches of [`ContextOp`]s for a mission. Implementations should
/// treat a batch as best-effort: losing the last few seconds of context
/// writes on crash is acceptable, since the in-memory state is the source of
/// truth while a mission is running.
#[async_trait]
pub trait ContextWriter: Send + Sync {
    /// Persists `ops`, in order, for `mission_id`.
    async fn write_batch(&self, mission_id: MissionId, ops: Vec<ContextOp>) -> anyhow::Result<()>;
}

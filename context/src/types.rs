//! Mission working-state types: the outline tree, notes, goals, thoughts,
//! the scratchpad, and rendered report versions.

use chrono::{DateTime, Utc};
use maestro_core::{GoalId, LogId, MissionId, NoteId, OutlineHistoryId, ReportVersionId, SectionId, ThoughtId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a mission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Created but not yet started.
    Pending,
    /// The Planner is building or revising the outline.
    Planning,
    /// Sections are being researched and written.
    Running,
    /// Paused by the user or by a cooperative cancellation request.
    Paused,
    /// Stopped before completion and will not resume.
    Stopped,
    /// Ended in an unrecoverable error.
    Failed,
    /// Finished; a final report version exists.
    Completed,
}

impl MissionStatus {
    /// Returns `true` if this status accepts a resume request. Every
    /// terminal or suspended status is resumable: `unified_resume` can
    /// restart a mission from `paused`, `stopped`, `failed`, or even
    /// `completed` (to extend an already-finished report).
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Paused | Self::Stopped | Self::Failed | Self::Completed)
    }

    /// Returns `true` if no further state transitions are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }
}

/// How a section's content should be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStrategy {
    /// Written directly from existing context, no new research.
    Synthesize,
    /// Research cycles run first, then the section is synthesized.
    ResearchThenSynthesize,
    /// Driven primarily by the content already gathered for a sibling/parent.
    ContentBased,
}

/// A node in a mission's outline tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier for this section.
    pub id: SectionId,
    /// Parent section, or `None` at the root.
    pub parent_id: Option<SectionId>,
    /// Section heading.
    pub title: String,
    /// One-line brief describing what this section should cover.
    pub brief: String,
    /// Position among siblings.
    pub order: u32,
    /// How this section's content should be produced.
    pub research_strategy: ResearchStrategy,
    /// Sections that must be written before this one.
    pub depends_on: Vec<SectionId>,
    /// Whether a Researcher has been assigned to this section yet.
    pub assigned: bool,
}

/// An append-only snapshot of the outline, taken whenever the Planner
/// revises it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineHistoryEntry {
    /// Stable identifier for this snapshot row.
    pub id: OutlineHistoryId,
    /// Mission this snapshot belongs to.
    pub mission_id: MissionId,
    /// Which Planner/Reflector revision round produced this outline.
    pub round: u32,
    /// The outline at the time of this snapshot.
    pub sections: Vec<Section>,
}

/// An atomic, cited claim extracted by a Researcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Stable identifier for this note.
    pub id: NoteId,
    /// Section this note supports, if assigned.
    pub section_id: Option<SectionId>,
    /// The claim text.
    pub text: String,
    /// Evidence `source_id`s backing this claim (see `maestro_core::Evidence`).
    pub citations: Vec<String>,
}

/// Whether a goal-pad entry is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Not yet satisfied.
    Open,
    /// Satisfied; kept for the record.
    Done,
}

/// An entry in a mission's goal pad: a sub-objective the Planner tracks
/// across rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalEntry {
    /// Stable identifier for this goal.
    pub id: GoalId,
    /// Goal description.
    pub text: String,
    /// Current status.
    pub status: GoalStatus,
}

/// An entry in a mission's thought pad: a Reflector's running commentary,
/// never shown directly in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtEntry {
    /// Stable identifier for this thought.
    pub id: ThoughtId,
    /// The thought text.
    pub text: String,
}

/// A single append-only log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stable identifier for this log row.
    pub id: LogId,
    /// Severity, mirroring `tracing`'s levels.
    pub level: LogLevel,
    /// Which agent produced this line, if any.
    pub agent: Option<String>,
    /// The log message.
    pub message: String,
}

/// Log severity, mirroring the levels `tracing` defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Fine-grained diagnostic detail.
    Debug,
    /// Normal operational narration.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Failure worth surfacing to the user.
    Error,
}

/// Running token/cost/search accounting for a mission. Fields only ever grow;
/// `maestro-telemetry`'s interceptors are the only writers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MissionStats {
    /// Tokens consumed by prompts across every LLM call.
    pub prompt_tokens: u64,
    /// Tokens consumed by completions across every LLM call.
    pub completion_tokens: u64,
    /// Provider-native token count, when it differs from the above.
    pub native_tokens: u64,
    /// Accumulated dollar cost across every LLM call.
    pub cost_usd: f64,
    /// Number of web searches issued.
    pub web_searches: u64,
}

impl MissionStats {
    /// Combines two stats records, as when folding a telemetry delta into a
    /// mission's running total. Saturates rather than overflowing.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(other.completion_tokens),
            native_tokens: self.native_tokens.saturating_add(other.native_tokens),
            cost_usd: self.cost_usd + other.cost_usd,
            web_searches: self.web_searches.saturating_add(other.web_searches),
        }
    }
}

/// A rendered report version. Versions are append-only; revising a section
/// produces a new version rather than overwriting the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Stable identifier for this version.
    pub id: ReportVersionId,
    /// Mission this version belongs to.
    pub mission_id: MissionId,
    /// 1-indexed version number, monotonically increasing per mission.
    pub version: u32,
    /// The rendered markdown report.
    pub markdown: String,
    /// Whether this is the mission's current version. Exactly one version
    /// per mission has this set; saving a new version flips the previous
    /// holder's flag off in the same mutation.
    pub is_current: bool,
    /// Free-form note on what changed since the previous version, if any.
    pub revision_notes: Option<String>,
    /// When this version was rendered.
    pub created_at: DateTime<Utc>,
}

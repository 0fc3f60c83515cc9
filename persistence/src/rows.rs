//! Row types returned by the gateway's raw queries, and their conversions
//! to/from `maestro-context`'s in-memory types.

use chrono::{DateTime, Utc};
use maestro_context::{
    GoalEntry, GoalStatus, LogEntry, LogLevel, MissionStats, MissionStatus, Note, OutlineHistoryEntry, ReportVersion, Section, ThoughtEntry,
};
use maestro_core::{GoalId, LogId, MissionId, NoteId, OutlineHistoryId, ReportVersionId, SectionId, ThoughtId};
use sqlx::FromRow;

use crate::error::PersistenceError;

/// A `missions` table row: everything about a mission except its working
/// state, which lives in the side tables.
#[derive(Debug, Clone, FromRow)]
pub struct MissionRecord {
    /// The mission's id, as text.
    pub mission_id: String,
    /// The original user query.
    pub query: String,
    /// Current lifecycle status, as text (see `maestro_context::MissionStatus`).
    pub status: String,
    /// Schema version of `settings_snapshot`.
    pub settings_version: i32,
    /// The mission's frozen settings, opaque to this crate.
    pub settings_snapshot: serde_json::Value,
    /// Cumulative prompt tokens across every LLM call.
    pub prompt_tokens: i64,
    /// Cumulative completion tokens across every LLM call.
    pub completion_tokens: i64,
    /// Cumulative provider-native tokens across every LLM call.
    pub native_tokens: i64,
    /// Cumulative dollar cost across every LLM call.
    pub cost_usd: f64,
    /// Cumulative web search count.
    pub web_searches: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl MissionRecord {
    /// Projects the accumulated stats columns into a [`MissionStats`].
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn stats(&self) -> MissionStats {
        MissionStats {
            prompt_tokens: self.prompt_tokens as u64,
            completion_tokens: self.completion_tokens as u64,
            native_tokens: self.native_tokens as u64,
            cost_usd: self.cost_usd,
            web_searches: self.web_searches as u64,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct LogRow {
    pub id: String,
    pub mission_id: String,
    pub level: String,
    pub agent: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct NoteRow {
    pub id: String,
    pub section_id: Option<String>,
    pub text: String,
    pub citations: serde_json::Value,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OutlineHistoryRow {
    pub id: String,
    pub mission_id: String,
    pub round: i32,
    pub sections: serde_json::Value,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReportVersionRow {
    pub id: String,
    pub mission_id: String,
    pub version: i32,
    pub markdown: String,
    pub is_current: bool,
    pub revision_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct GoalRow {
    pub id: String,
    pub text: String,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ThoughtRow {
    pub id: String,
    pub text: String,
}

fn parse_id<T: std::str::FromStr>(table: &'static str, raw: &str) -> crate::error::Result<T> {
    raw.parse::<T>().map_err(|_| PersistenceError::MalformedRow { table, detail: format!("could not parse id '{raw}'") })
}

impl LogRow {
    pub(crate) fn into_entry(self) -> crate::error::Result<LogEntry> {
        let level = match self.level.as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => return Err(PersistenceError::MalformedRow { table: "mission_logs", detail: format!("unknown level '{other}'") }),
        };
        Ok(LogEntry { id: parse_id::<LogId>("mission_logs", &self.id)?, level, agent: self.agent, message: self.message })
    }
}

impl NoteRow {
    pub(crate) fn into_note(self) -> crate::error::Result<Note> {
        let section_id = self.section_id.as_deref().map(|s| parse_id::<SectionId>("mission_notes", s)).transpose()?;
        let citations: Vec<String> = serde_json::from_value(self.citations)
            .map_err(|err| PersistenceError::MalformedRow { table: "mission_notes", detail: err.to_string() })?;
        Ok(Note { id: parse_id::<NoteId>("mission_notes", &self.id)?, section_id, text: self.text, citations })
    }
}

impl OutlineHistoryRow {
    pub(crate) fn into_entry(self) -> crate::error::Result<OutlineHistoryEntry> {
        let mission_id = parse_id::<MissionId>("mission_outline_history", &self.mission_id)?;
        let sections: Vec<Section> = serde_json::from_value(self.sections)
            .map_err(|err| PersistenceError::MalformedRow { table: "mission_outline_history", detail: err.to_string() })?;
        Ok(OutlineHistoryEntry {
            id: parse_id::<OutlineHistoryId>("mission_outline_history", &self.id)?,
            mission_id,
            #[allow(clippy::cast_sign_loss)]
            round: self.round as u32,
            sections,
        })
    }
}

impl ReportVersionRow {
    pub(crate) fn into_version(self) -> crate::error::Result<ReportVersion> {
        Ok(ReportVersion {
            id: parse_id::<ReportVersionId>("mission_report_versions", &self.id)?,
            mission_id: parse_id::<MissionId>("mission_report_versions", &self.mission_id)?,
            #[allow(clippy::cast_sign_loss)]
            version: self.version as u32,
            markdown: self.markdown,
            is_current: self.is_current,
            revision_notes: self.revision_notes,
            created_at: self.created_at,
        })
    }
}

impl GoalRow {
    pub(crate) fn into_entry(self) -> crate::error::Result<GoalEntry> {
        let status = match self.status.as_str() {
            "open" => GoalStatus::Open,
            "done" => GoalStatus::Done,
            other => return Err(PersistenceError::MalformedRow { table: "mission_goals", detail: format!("unknown status '{other}'") }),
        };
        Ok(GoalEntry { id: parse_id::<GoalId>("mission_goals", &self.id)?, text: self.text, status })
    }
}

impl ThoughtRow {
    pub(crate) fn into_entry(self) -> crate::error::Result<ThoughtEntry> {
        Ok(ThoughtEntry { id: parse_id::<ThoughtId>("mission_thoughts", &self.id)?, text: self.text })
    }
}

pub(crate) fn goal_status_str(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Open => "open",
        GoalStatus::Done => "done",
    }
}

pub(crate) fn log_level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

pub(crate) fn mission_status_str(status: MissionStatus) -> &'static str {
    match status {
        MissionStatus::Pending => "pending",
        MissionStatus::Planning => "planning",
        MissionStatus::Running => "running",
        MissionStatus::Paused => "paused",
        MissionStatus::Stopped => "stopped",
        MissionStatus::Failed => "failed",
        MissionStatus::Completed => "completed",
    }
}

pub(crate) fn parse_mission_status(raw: &str) -> crate::error::Result<MissionStatus> {
    Ok(match raw {
        "pending" => MissionStatus::Pending,
        "planning" => MissionStatus::Planning,
        "running" => MissionStatus::Running,
        "paused" => MissionStatus::Paused,
        "stopped" => MissionStatus::Stopped,
        "failed" => MissionStatus::Failed,
        "completed" => MissionStatus::Completed,
        other => return Err(PersistenceError::MalformedRow { table: "missions", detail: format!("unknown status '{other}'") }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_status_round_trips_through_its_string_form() {
        for status in [
            MissionStatus::Pending,
            MissionStatus::Planning,
            MissionStatus::Running,
            MissionStatus::Paused,
            MissionStatus::Stopped,
            MissionStatus::Failed,
            MissionStatus::Completed,
        ] {
            assert_eq!(parse_mission_status(mission_status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn parse_mission_status_rejects_unknown_values() {
        assert!(parse_mission_status("archived").is_err());
    }

    #[test]
    fn note_row_parses_empty_citations() {
        let row = NoteRow { id: NoteId::new().to_string(), section_id: None, text: "claim".into(), citations: serde_json::json!([]) };
        let note = row.into_note().unwrap();
        assert!(note.section_id.is_none());
        assert!(note.citations.is_empty());
    }

    #[test]
    fn note_row_rejects_malformed_section_id() {
        let row = NoteRow { id: NoteId::new().to_string(), section_id: Some("not-a-ulid".into()), text: "claim".into(), citations: serde_json::json!([]) };
        assert!(row.into_note().is_err());
    }

    #[test]
    fn log_row_rejects_unknown_level() {
        let row = LogRow { id: LogId::new().to_string(), mission_id: MissionId::new().to_string(), level: "verbose".into(), agent: None, message: "hi".into() };
        assert!(row.into_entry().is_err());
    }
}

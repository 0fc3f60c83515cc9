//! A single mission's in-memory working state.

use maestro_core::{MissionId, SectionId};

use crate::types::{GoalEntry, LogEntry, MissionStats, MissionStatus, Note, OutlineHistoryEntry, ReportVersion, Section, ThoughtEntry};

/// A mission's full in-memory working state: the outline, notes, goal and
/// thought pads, scratchpad, logs, and every rendered report version.
#[derive(Debug, Clone)]
pub struct MissionState {
    /// This mission's id.
    pub mission_id: MissionId,
    /// Current lifecycle status.
    pub status: MissionStatus,
    /// The original user query.
    pub query: String,
    /// Current outline (the latest revision).
    pub outline: Vec<Section>,
    /// Every outline revision, oldest first.
    pub outline_history: Vec<OutlineHistoryEntry>,
    /// Notes gathered so far, in insertion order.
    pub notes: Vec<Note>,
    /// The Planner's goal pad.
    pub goals: Vec<GoalEntry>,
    /// The Reflector's thought pad.
    pub thoughts: Vec<ThoughtEntry>,
    /// Free-form scratch text, replaced wholesale by `set_scratchpad`.
    pub scratchpad: String,
    /// Append-only log lines.
    pub logs: Vec<LogEntry>,
    /// Every rendered report version, oldest first.
    pub report_versions: Vec<ReportVersion>,
    /// Running token/cost/search accounting.
    pub stats: MissionStats,
}

impl MissionState {
    /// Creates fresh, empty state for a newly created mission.
    #[must_use]
    pub fn new(mission_id: MissionId, query: impl Into<String>) -> Self {
        Self {
            mission_id,
            status: MissionStatus::Pending,
            query: query.into(),
            outline: Vec::new(),
            outline_history: Vec::new(),
            notes: Vec::new(),
            goals: Vec::new(),
            thoughts: Vec::new(),
            scratchpad: String::new(),
            logs: Vec::new(),
            report_versions: Vec::new(),
            stats: MissionStats::default(),
        }
    }

    /// Returns the section with this id, if it's in the current outline.
    #[must_use]
    pub fn section(&self, section_id: SectionId) -> Option<&Section> {
        self.outline.iter().find(|s| s.id == section_id)
    }

    /// Returns the latest report version, if any has been rendered.
    #[must_use]
    pub fn latest_report_version(&self) -> Option<&ReportVersion> {
        self.report_versions.last()
    }

    /// Returns the report version numbered `version`, if it exists.
    #[must_use]
    pub fn report_version(&self, version: u32) -> Option<&ReportVersion> {
        self.report_versions.iter().find(|v| v.version == version)
    }

    /// Returns notes assigned to `section_id`, in creation order.
    #[must_use]
    pub fn notes_for_section(&self, section_id: SectionId) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.section_id == Some(section_id)).collect()
    }

    /// Orders the current outline so every section appears after the
    /// sections it `depends_on`. Returns `None` if the dependency graph has
    /// a cycle or references a section outside the outline.
    #[must_use]
    pub fn topological_sections(&self) -> Option<Vec<&Section>> {
        let mut remaining: Vec<&Section> = self.outline.iter().collect();
        let mut done = std::collections::HashSet::new();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready_idx = remaining.iter().position(|s| s.depends_on.iter().all(|dep| done.contains(dep)))?;
            let section = remaining.remove(ready_idx);
            done.insert(section.id);
            ordered.push(section);
        }
        Some(ordered)
    }
}

//! [`MissionContextStore`]: the single place every agent reads and writes a
//! mission's working state through.

use std::collections::HashMap;
use std::sync::Arc;

use maestro_core::{MissionId, OutlineHistoryId, ReportVersionId};
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{ContextError, Result};
use crate::state::MissionState;
use crate::types::{GoalEntry, LogEntry, MissionStats, MissionStatus, Note, OutlineHistoryEntry, ReportVersion, Section, ThoughtEntry};
use crate::writer::{ContextOp, ContextWriter};

struct MissionSlot {
    state: AsyncMutex<MissionState>,
    pending: AsyncMutex<Vec<ContextOp>>,
}

/// Holds every active mission's working state behind a per-mission lock, so
/// concurrent agents on *different* missions never contend, while writers on
/// the *same* mission serialize naturally.
pub struct MissionContextStore {
    missions: RwLock<HashMap<MissionId, Arc<MissionSlot>>>,
    writer: Option<Arc<dyn ContextWriter>>,
}

impl std::fmt::Debug for MissionContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionContextStore").field("missions", &self.missions.read().len()).finish()
    }
}

impl MissionContextStore {
    /// Creates an empty store with no write-behind persistence.
    #[must_use]
    pub fn new() -> Self {
        Self { missions: RwLock::new(HashMap::new()), writer: None }
    }

    /// Creates a store that queues every mutation for `writer` to persist on
    /// [`MissionContextStore::flush`].
    #[must_use]
    pub fn with_writer(writer: Arc<dyn ContextWriter>) -> Self {
        Self { missions: RwLock::new(HashMap::new()), writer: Some(writer) }
    }

    fn slot_for(&self, mission_id: MissionId) -> Arc<MissionSlot> {
        if let Some(slot) = self.missions.read().get(&mission_id) {
            return Arc::clone(slot);
        }
        let mut missions = self.missions.write();
        Arc::clone(missions.entry(mission_id).or_insert_with(|| {
            Arc::new(MissionSlot { state: AsyncMutex::new(MissionState::new(mission_id, String::new())), pending: AsyncMutex::new(Vec::new()) })
        }))
    }

    /// Creates state for a brand-new mission. Returns the existing state
    /// unchanged if `mission_id` was already known (e.g. a restart restoring
    /// from persistence).
    pub async fn create_mission(&self, mission_id: MissionId, query: impl Into<String>) {
        let slot = self.slot_for(mission_id);
        let mut state = slot.state.lock().await;
        if state.query.is_empty() && state.outline.is_empty() && state.notes.is_empty() {
            *state = MissionState::new(mission_id, query);
        }
    }

    /// Restores a mission's full state, e.g. from a persistence snapshot at
    /// process startup. Overwrites any in-memory state that already existed.
    pub async fn load(&self, state: MissionState) {
        let slot = self.slot_for(state.mission_id);
        *slot.state.lock().await = state;
    }

    /// Returns a clone of a mission's current state.
    pub async fn snapshot(&self, mission_id: MissionId) -> Result<MissionState> {
        let slot = self.slot_for(mission_id);
        Ok(slot.state.lock().await.clone())
    }

    async fn mutate<T>(&self, mission_id: MissionId, op: ContextOp, f: impl FnOnce(&mut MissionState) -> T) -> T {
        let slot = self.slot_for(mission_id);
        let mut state = slot.state.lock().await;
        let result = f(&mut state);
        drop(state);
        slot.pending.lock().await.push(op);
        result
    }

    /// Appends a note.
    pub async fn append_note(&self, mission_id: MissionId, note: Note) {
        self.mutate(mission_id, ContextOp::AppendNote(note.clone()), |state| state.notes.push(note)).await;
    }

    /// Appends a log line.
    pub async fn append_log(&self, mission_id: MissionId, entry: LogEntry) {
        self.mutate(mission_id, ContextOp::AppendLog(entry.clone()), |state| state.logs.push(entry)).await;
    }

    /// Appends a thought.
    pub async fn append_thought(&self, mission_id: MissionId, entry: ThoughtEntry) {
        self.mutate(mission_id, ContextOp::AppendThought(entry.clone()), |state| state.thoughts.push(entry)).await;
    }

    /// Inserts a goal, or replaces it in place if its id already exists.
    pub async fn upsert_goal(&self, mission_id: MissionId, goal: GoalEntry) {
        self.mutate(mission_id, ContextOp::UpsertGoal(goal.clone()), |state| {
            if let Some(existing) = state.goals.iter_mut().find(|g| g.id == goal.id) {
                *existing = goal;
            } else {
                state.goals.push(goal);
            }
        })
        .await;
    }

    /// Replaces the mission's scratchpad wholesale.
    pub async fn set_scratchpad(&self, mission_id: MissionId, text: impl Into<String>) {
        let text = text.into();
        self.mutate(mission_id, ContextOp::SetScratchpad(text.clone()), |state| state.scratchpad = text).await;
    }

    /// Records a new outline revision and makes it the mission's current
    /// outline.
    pub async fn snapshot_outline(&self, mission_id: MissionId, round: u32, sections: Vec<Section>) -> OutlineHistoryId {
        let entry = OutlineHistoryEntry { id: OutlineHistoryId::new(), mission_id, round, sections: sections.clone() };
        let id = entry.id;
        self.mutate(mission_id, ContextOp::SnapshotOutline(entry.clone()), |state| {
            state.outline = sections;
            state.outline_history.push(entry);
        })
        .await;
        id
    }

    /// Renders and records a new report version, numbered one past the
    /// mission's current latest version. Flips off the previous version's
    /// `is_current` flag in the same mutation, so exactly one version stays
    /// current at all times.
    pub async fn save_report_version(&self, mission_id: MissionId, markdown: impl Into<String>, revision_notes: Option<String>) -> ReportVersionId {
        let markdown = markdown.into();
        let slot = self.slot_for(mission_id);
        let mut state = slot.state.lock().await;
        let version = state.report_versions.last().map_or(1, |v| v.version + 1);
        for existing in &mut state.report_versions {
            existing.is_current = false;
        }
        let entry = ReportVersion { id: ReportVersionId::new(), mission_id, version, markdown, is_current: true, revision_notes, created_at: chrono::Utc::now() };
        let id = entry.id;
        state.report_versions.push(entry.clone());
        drop(state);
        slot.pending.lock().await.push(ContextOp::SaveReportVersion(entry));
        id
    }

    /// Transitions a mission to a new lifecycle status. Returns the previous
    /// status.
    pub async fn set_status(&self, mission_id: MissionId, status: MissionStatus) -> MissionStatus {
        self.mutate(mission_id, ContextOp::UpdateStatus(status), |state| std::mem::replace(&mut state.status, status)).await
    }

    /// Folds a telemetry delta additively into the mission's running stats.
    /// Never overwrites: every field only ever grows.
    pub async fn record_stats(&self, mission_id: MissionId, delta: MissionStats) {
        self.mutate(mission_id, ContextOp::RecordStats(delta), |state| state.stats = state.stats.saturating_add(delta)).await;
    }

    /// Returns a specific report version by number, if it exists.
    pub async fn get_report_version(&self, mission_id: MissionId, version: u32) -> Option<ReportVersion> {
        let slot = self.slot_for(mission_id);
        slot.state.lock().await.report_version(version).cloned()
    }

    /// Flushes every pending write queued for `mission_id` through the
    /// configured [`ContextWriter`]. A no-op store with no writer configured
    /// just drops the queue.
    pub async fn flush(&self, mission_id: MissionId) -> Result<()> {
        let slot = self.slot_for(mission_id);
        let mut pending = slot.pending.lock().await;
        if pending.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut *pending);
        drop(pending);

        if let Some(writer) = &self.writer {
            if let Err(source) = writer.write_batch(mission_id, ops).await {
                return Err(ContextError::FlushFailed { mission_id, source });
            }
        }
        Ok(())
    }

    /// Drops a mission's in-memory state entirely. Callers should `flush`
    /// first if a writer is configured.
    pub fn forget_mission(&self, mission_id: MissionId) {
        self.missions.write().remove(&mission_id);
    }
}

impl Default for MissionContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use maestro_core::{GoalId, LogId, NoteId, ThoughtId};

    use super::*;
    use crate::types::{GoalStatus, LogLevel, MissionStatus};

    fn note(text: &str) -> Note {
        Note { id: NoteId::new(), section_id: None, text: text.to_string(), citations: Vec::new() }
    }

    #[tokio::test]
    async fn append_note_is_visible_in_snapshot() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;
        store.append_note(mission_id, note("claim one")).await;

        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.notes.len(), 1);
        assert_eq!(snapshot.notes[0].text, "claim one");
    }

    #[tokio::test]
    async fn upsert_goal_replaces_existing_entry() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;

        let goal_id = GoalId::new();
        store.upsert_goal(mission_id, GoalEntry { id: goal_id, text: "find X".into(), status: GoalStatus::Open }).await;
        store.upsert_goal(mission_id, GoalEntry { id: goal_id, text: "find X".into(), status: GoalStatus::Done }).await;

        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.goals.len(), 1);
        assert_eq!(snapshot.goals[0].status, GoalStatus::Done);
    }

    #[tokio::test]
    async fn report_versions_increment() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;

        store.save_report_version(mission_id, "draft one", None).await;
        store.save_report_version(mission_id, "draft two", Some("added citations".into())).await;

        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.report_versions.len(), 2);
        assert_eq!(snapshot.report_versions[1].version, 2);
        assert!(!snapshot.report_versions[0].is_current);
        assert!(snapshot.report_versions[1].is_current);
    }

    #[tokio::test]
    async fn record_stats_accumulates_across_calls() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;

        store.record_stats(mission_id, MissionStats { prompt_tokens: 10, completion_tokens: 5, native_tokens: 0, cost_usd: 0.01, web_searches: 1 }).await;
        store.record_stats(mission_id, MissionStats { prompt_tokens: 3, completion_tokens: 2, native_tokens: 0, cost_usd: 0.002, web_searches: 0 }).await;

        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.stats.prompt_tokens, 13);
        assert_eq!(snapshot.stats.completion_tokens, 7);
        assert_eq!(snapshot.stats.web_searches, 1);
        assert!((snapshot.stats.cost_usd - 0.012).abs() < 1e-9);
    }

    #[tokio::test]
    async fn set_status_returns_previous_status() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;

        let previous = store.set_status(mission_id, MissionStatus::Planning).await;
        assert_eq!(previous, MissionStatus::Pending);

        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.status, MissionStatus::Planning);
    }

    #[tokio::test]
    async fn flush_with_no_writer_just_drains_pending() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;
        store.append_log(mission_id, LogEntry { id: LogId::new(), level: LogLevel::Info, agent: None, message: "hi".into() }).await;
        store.flush(mission_id).await.unwrap();
    }

    struct RecordingWriter {
        batches: AsyncMutex<Vec<(MissionId, Vec<ContextOp>)>>,
    }

    #[async_trait::async_trait]
    impl ContextWriter for RecordingWriter {
        async fn write_batch(&self, mission_id: MissionId, ops: Vec<ContextOp>) -> anyhow::Result<()> {
            self.batches.lock().await.push((mission_id, ops));
            Ok(())
        }
    }

    #[tokio::test]
    async fn flush_delivers_batched_ops_to_writer() {
        let writer = Arc::new(RecordingWriter { batches: AsyncMutex::new(Vec::new()) });
        let store = MissionContextStore::with_writer(writer.clone());
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;
        store.append_note(mission_id, note("a")).await;
        store.append_thought(mission_id, ThoughtEntry { id: ThoughtId::new(), text: "thinking".into() }).await;

        store.flush(mission_id).await.unwrap();

        let batches = writer.batches.lock().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1.len(), 2);
    }

    #[tokio::test]
    async fn forget_mission_drops_state() {
        let store = MissionContextStore::new();
        let mission_id = MissionId::new();
        store.create_mission(mission_id, "query").await;
        store.forget_mission(mission_id);
        // A fresh slot is created transparently on next access.
        let snapshot = store.snapshot(mission_id).await.unwrap();
        assert!(snapshot.notes.is_empty());
        let _ = MissionStatus::Pending;
    }
}

//! [`PersistenceGateway`]: a Postgres-backed [`ContextWriter`] plus the raw
//! read-side queries the root facade uses to serve mission history.

use async_trait::async_trait;
use maestro_context::{ContextOp, ContextWriter, MissionState, MissionStatus};
use maestro_core::MissionId;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::error::{PersistenceError, Result};
use crate::pagination::Pagination;
use crate::rows::{
    goal_status_str, log_level_str, mission_status_str, parse_mission_status, GoalRow, LogRow, MissionRecord, NoteRow, OutlineHistoryRow,
    ReportVersionRow, ThoughtRow,
};

/// A relational store for mission history, backed by Postgres via `sqlx`.
///
/// Queries here are runtime-checked (`query_as::<_, T>` + `.bind()`) rather
/// than compile-time-checked (`query_as!`), since the latter needs a live
/// database or a cached query manifest at build time.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    pool: PgPool,
}

impl PersistenceGateway {
    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("creating database connection pool");
        let pool = PgPoolOptions::new().max_connections(5).connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-open pool, e.g. one shared with another subsystem.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies every pending migration under `./migrations`.
    pub async fn migrate(&self) -> Result<()> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|err| {
            error!(%err, "migration failed");
            PersistenceError::Database(sqlx::Error::Migrate(Box::new(err)))
        })
    }

    /// Inserts a brand-new mission row.
    pub async fn insert_mission(
        &self,
        mission_id: MissionId,
        query: &str,
        settings_version: u32,
        settings_snapshot: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO missions (mission_id, query, status, settings_version, settings_snapshot) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(mission_id.to_string())
        .bind(query)
        .bind(mission_status_str(MissionStatus::Pending))
        .bind(i32::try_from(settings_version).unwrap_or(i32::MAX))
        .bind(settings_snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Updates a mission's status and bumps `updated_at`.
    pub async fn update_mission_status(&self, mission_id: MissionId, status: MissionStatus) -> Result<()> {
        sqlx::query("UPDATE missions SET status = $1, updated_at = now() WHERE mission_id = $2")
            .bind(mission_status_str(status))
            .bind(mission_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Folds a telemetry delta additively into a mission's stat columns.
    /// Never overwrites: every column only ever grows.
    pub async fn record_stats(&self, mission_id: MissionId, delta: maestro_context::MissionStats) -> Result<()> {
        sqlx::query(
            "UPDATE missions SET prompt_tokens = prompt_tokens + $1, completion_tokens = completion_tokens + $2, \
             native_tokens = native_tokens + $3, cost_usd = cost_usd + $4, web_searches = web_searches + $5, updated_at = now() \
             WHERE mission_id = $6",
        )
        .bind(i64::try_from(delta.prompt_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(delta.completion_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(delta.native_tokens).unwrap_or(i64::MAX))
        .bind(delta.cost_usd)
        .bind(i64::try_from(delta.web_searches).unwrap_or(i64::MAX))
        .bind(mission_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches a single mission's record.
    pub async fn get_mission(&self, mission_id: MissionId) -> Result<MissionRecord> {
        sqlx::query_as::<_, MissionRecord>("SELECT * FROM missions WHERE mission_id = $1")
            .bind(mission_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PersistenceError::UnknownMission(mission_id))
    }

    /// Lists missions, most recently created first.
    pub async fn list_missions(&self, pagination: Pagination) -> Result<Vec<MissionRecord>> {
        Ok(sqlx::query_as::<_, MissionRecord>("SELECT * FROM missions ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Lists a mission's log lines, oldest first.
    pub async fn list_logs(&self, mission_id: MissionId, pagination: Pagination) -> Result<Vec<maestro_context::LogEntry>> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT id, mission_id, level, agent, message FROM mission_logs WHERE mission_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(mission_id.to_string())
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LogRow::into_entry).collect()
    }

    /// Lists a mission's notes, oldest first.
    pub async fn list_notes(&self, mission_id: MissionId, pagination: Pagination) -> Result<Vec<maestro_context::Note>> {
        let rows = sqlx::query_as::<_, NoteRow>(
            "SELECT id, section_id, text, citations FROM mission_notes WHERE mission_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(mission_id.to_string())
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(NoteRow::into_note).collect()
    }

    /// Lists a mission's outline revisions, oldest first.
    pub async fn list_outline_history(
        &self,
        mission_id: MissionId,
        pagination: Pagination,
    ) -> Result<Vec<maestro_context::OutlineHistoryEntry>> {
        let rows = sqlx::query_as::<_, OutlineHistoryRow>(
            "SELECT id, mission_id, round, sections FROM mission_outline_history WHERE mission_id = $1 ORDER BY round ASC LIMIT $2 OFFSET $3",
        )
        .bind(mission_id.to_string())
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OutlineHistoryRow::into_entry).collect()
    }

    /// Lists a mission's rendered report versions, oldest first.
    pub async fn list_report_versions(
        &self,
        mission_id: MissionId,
        pagination: Pagination,
    ) -> Result<Vec<maestro_context::ReportVersion>> {
        let rows = sqlx::query_as::<_, ReportVersionRow>(
            "SELECT id, mission_id, version, markdown, is_current, revision_notes, created_at FROM mission_report_versions \
             WHERE mission_id = $1 ORDER BY version ASC LIMIT $2 OFFSET $3",
        )
        .bind(mission_id.to_string())
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ReportVersionRow::into_version).collect()
    }

    /// Fetches a single report version by number.
    pub async fn get_report_version(&self, mission_id: MissionId, version: u32) -> Result<Option<maestro_context::ReportVersion>> {
        let row = sqlx::query_as::<_, ReportVersionRow>(
            "SELECT id, mission_id, version, markdown, is_current, revision_notes, created_at FROM mission_report_versions \
             WHERE mission_id = $1 AND version = $2",
        )
        .bind(mission_id.to_string())
        .bind(i32::try_from(version).unwrap_or(i32::MAX))
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReportVersionRow::into_version).transpose()
    }

    /// Lists a mission's goal pad.
    pub async fn list_goals(&self, mission_id: MissionId) -> Result<Vec<maestro_context::GoalEntry>> {
        let rows = sqlx::query_as::<_, GoalRow>(
            "SELECT id, text, status FROM mission_goals WHERE mission_id = $1 ORDER BY created_at ASC",
        )
        .bind(mission_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GoalRow::into_entry).collect()
    }

    /// Lists a mission's thought pad, oldest first.
    pub async fn list_thoughts(&self, mission_id: MissionId, pagination: Pagination) -> Result<Vec<maestro_context::ThoughtEntry>> {
        let rows = sqlx::query_as::<_, ThoughtRow>(
            "SELECT id, text FROM mission_thoughts WHERE mission_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(mission_id.to_string())
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ThoughtRow::into_entry).collect()
    }

    /// Rebuilds a mission's full working state from its relational history,
    /// for restoring `maestro-context` after a process restart.
    pub async fn load_mission_state(&self, mission_id: MissionId) -> Result<MissionState> {
        let record = self.get_mission(mission_id).await?;
        let mut state = MissionState::new(mission_id, record.query.clone());
        state.status = parse_mission_status(&record.status)?;
        state.stats = record.stats();

        let all = Pagination::new(500, 0);
        state.logs = self.list_logs(mission_id, all).await?;
        state.notes = self.list_notes(mission_id, all).await?;
        state.goals = self.list_goals(mission_id).await?;
        state.thoughts = self.list_thoughts(mission_id, all).await?;
        state.report_versions = self.list_report_versions(mission_id, all).await?;
        state.outline_history = self.list_outline_history(mission_id, all).await?;
        if let Some(latest) = state.outline_history.last() {
            state.outline = latest.sections.clone();
        }
        Ok(state)
    }

    async fn apply_op(&self, mission_id: MissionId, op: ContextOp) -> Result<()> {
        match op {
            ContextOp::AppendNote(note) => {
                let citations = serde_json::to_value(&note.citations)
                    .map_err(|err| PersistenceError::MalformedRow { table: "mission_notes", detail: err.to_string() })?;
                sqlx::query("INSERT INTO mission_notes (id, mission_id, section_id, text, citations) VALUES ($1, $2, $3, $4, $5)")
                    .bind(note.id.to_string())
                    .bind(mission_id.to_string())
                    .bind(note.section_id.map(|id| id.to_string()))
                    .bind(note.text)
                    .bind(citations)
                    .execute(&self.pool)
                    .await?;
            }
            ContextOp::AppendLog(entry) => {
                sqlx::query("INSERT INTO mission_logs (id, mission_id, level, agent, message) VALUES ($1, $2, $3, $4, $5)")
                    .bind(entry.id.to_string())
                    .bind(mission_id.to_string())
                    .bind(log_level_str(entry.level))
                    .bind(entry.agent)
                    .bind(entry.message)
                    .execute(&self.pool)
                    .await?;
            }
            ContextOp::AppendThought(entry) => {
                sqlx::query("INSERT INTO mission_thoughts (id, mission_id, text) VALUES ($1, $2, $3)")
                    .bind(entry.id.to_string())
                    .bind(mission_id.to_string())
                    .bind(entry.text)
                    .execute(&self.pool)
                    .await?;
            }
            ContextOp::UpsertGoal(goal) => {
                sqlx::query(
                    "INSERT INTO mission_goals (id, mission_id, text, status) VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (id) DO UPDATE SET text = EXCLUDED.text, status = EXCLUDED.status, updated_at = now()",
                )
                .bind(goal.id.to_string())
                .bind(mission_id.to_string())
                .bind(goal.text)
                .bind(goal_status_str(goal.status))
                .execute(&self.pool)
                .await?;
            }
            ContextOp::SetScratchpad(_) => {
                // The scratchpad is transient working memory; it isn't durable state.
            }
            ContextOp::SnapshotOutline(entry) => {
                let sections = serde_json::to_value(&entry.sections)
                    .map_err(|err| PersistenceError::MalformedRow { table: "mission_outline_history", detail: err.to_string() })?;
                sqlx::query("INSERT INTO mission_outline_history (id, mission_id, round, sections) VALUES ($1, $2, $3, $4)")
                    .bind(entry.id.to_string())
                    .bind(mission_id.to_string())
                    .bind(i32::try_from(entry.round).unwrap_or(i32::MAX))
                    .bind(sections)
                    .execute(&self.pool)
                    .await?;
            }
            ContextOp::SaveReportVersion(version) => {
                // Only one row per mission may carry `is_current`; clear the
                // old holder before inserting the new current version.
                sqlx::query("UPDATE mission_report_versions SET is_current = false WHERE mission_id = $1 AND is_current")
                    .bind(mission_id.to_string())
                    .execute(&self.pool)
                    .await?;
                sqlx::query(
                    "INSERT INTO mission_report_versions (id, mission_id, version, markdown, is_current, revision_notes) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(version.id.to_string())
                .bind(mission_id.to_string())
                .bind(i32::try_from(version.version).unwrap_or(i32::MAX))
                .bind(version.markdown)
                .bind(version.is_current)
                .bind(version.revision_notes)
                .execute(&self.pool)
                .await?;
            }
            ContextOp::UpdateStatus(status) => {
                self.update_mission_status(mission_id, status).await?;
            }
            ContextOp::RecordStats(delta) => {
                self.record_stats(mission_id, delta).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContextWriter for PersistenceGateway {
    async fn write_batch(&self, mission_id: MissionId, ops: Vec<ContextOp>) -> anyhow::Result<()> {
        debug!(%mission_id, count = ops.len(), "flushing context ops");
        let mut tx_failed = None;
        for op in ops {
            if let Err(err) = self.apply_op(mission_id, op).await {
                tx_failed = Some(err);
                break;
            }
        }
        match tx_failed {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

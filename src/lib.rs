//! # maestro
//!
//! The root façade: wires the context store, event bus, retriever, agents,
//! and mission controller into a single [`MaestroEngine`], and layers an
//! optional [`maestro_persistence::PersistenceGateway`] underneath for
//! write-behind durability and restart recovery.
//!
//! Everything an embedder needs is exposed from here; the subcrates
//! (`maestro-core`, `maestro-context`, `maestro-controller`, ...) are public
//! but most callers only need this module.

pub mod config;
pub mod error;

use std::sync::Arc;

use maestro_agents::{DefaultPlanner, DefaultReflector, DefaultResearcher, DefaultWriter, Planner, Reflector, Researcher, Writer};
use maestro_bus::{EventBus, Subscription, Topic};
use maestro_context::{ContextWriter, GoalEntry, LogEntry, MissionContextStore, MissionStatus, Note, OutlineHistoryEntry, ReportVersion};
use maestro_controller::{CreateMissionRequest, MissionController};
use maestro_core::{EmbeddingClient, LLMClient, MissionId, MissionSettings, WebSearchClient};
use maestro_index::HybridIndex;
use maestro_persistence::{Pagination, PersistenceGateway};
use maestro_retriever::{DocChannel, RetrievalChannel, RetrieverExecutor, WebChannel};

pub use config::EngineConfig;
pub use error::{EngineError, Result};

/// A fully wired mission engine. Generic over `L`, the LLM provider adapter
/// every mission's agents call through.
pub struct MaestroEngine<L: LLMClient> {
    context: Arc<MissionContextStore>,
    bus: Arc<EventBus>,
    controller: Arc<MissionController<L>>,
    persistence: Option<Arc<PersistenceGateway>>,
}

impl<L: LLMClient> std::fmt::Debug for MaestroEngine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaestroEngine").field("persistent", &self.persistence.is_some()).finish()
    }
}

impl<L: LLMClient + Send + Sync + 'static> MaestroEngine<L> {
    /// Assembles an engine from its capability adapters.
    ///
    /// `persistence`, when given, makes mission context durable across
    /// restarts; without it the engine runs entirely in memory, which is
    /// the common shape for tests and short-lived tools.
    pub fn new<E>(
        llm: Arc<L>,
        index: Arc<HybridIndex>,
        embedder: Arc<E>,
        web_search: Arc<dyn WebSearchClient>,
        persistence: Option<Arc<PersistenceGateway>>,
        config: &EngineConfig,
    ) -> Arc<Self>
    where
        E: EmbeddingClient + Send + Sync + 'static,
    {
        let bus = Arc::new(EventBus::new(config.bus_topic_capacity));
        let context = Arc::new(match &persistence {
            Some(gateway) => MissionContextStore::with_writer(Arc::clone(gateway) as Arc<dyn ContextWriter>),
            None => MissionContextStore::new(),
        });

        let channels: Vec<Arc<dyn RetrievalChannel>> =
            vec![Arc::new(DocChannel::new(index, embedder, 0.5)) as Arc<dyn RetrievalChannel>, Arc::new(WebChannel::new(web_search))];
        let retriever = Arc::new(RetrieverExecutor::new(channels));

        let controller = Arc::new(MissionController::new(
            Arc::clone(&context),
            Arc::clone(&bus),
            retriever,
            llm,
            Arc::new(DefaultPlanner) as Arc<dyn Planner>,
            Arc::new(DefaultResearcher) as Arc<dyn Researcher>,
            Arc::new(DefaultReflector) as Arc<dyn Reflector>,
            Arc::new(DefaultWriter) as Arc<dyn Writer>,
            config.max_concurrent_requests,
        ));

        Arc::new(Self { context, bus, controller, persistence })
    }

    /// Creates a brand-new mission, persisting its initial row (if a
    /// relational store is configured) alongside the in-memory state the
    /// controller itself always creates.
    pub async fn create_mission(
        &self,
        query: impl Into<String>,
        user_id: impl Into<String>,
        settings_overrides: Option<serde_json::Value>,
    ) -> Result<MissionId> {
        let query = query.into();
        let mission_id = self
            .controller
            .create_mission(CreateMissionRequest { query: query.clone(), user_id: user_id.into(), settings_overrides })
            .await;
        if let Some(persistence) = &self.persistence {
            let settings = self.controller.settings_snapshot(mission_id)?;
            let snapshot = serde_json::to_value(&settings)?;
            persistence.insert_mission(mission_id, &query, settings.settings_version, &snapshot).await?;
        }
        Ok(mission_id)
    }

    /// Starts a `pending` mission.
    pub async fn start(&self, mission_id: MissionId) -> Result<()> {
        Ok(self.controller.start(mission_id).await?)
    }

    /// Requests cooperative cancellation of a running mission.
    pub async fn stop(&self, mission_id: MissionId) -> Result<()> {
        Ok(self.controller.stop(mission_id).await?)
    }

    /// Requests a cooperative pause of a running mission.
    pub async fn pause(&self, mission_id: MissionId) -> Result<()> {
        Ok(self.controller.pause(mission_id).await?)
    }

    /// Resumes a `paused` mission from where it left off.
    pub async fn resume(&self, mission_id: MissionId) -> Result<()> {
        Ok(self.controller.resume(mission_id).await?)
    }

    /// Resumes any resumable mission from `round_num`, folding `feedback`
    /// into the next planning pass.
    pub async fn unified_resume(&self, mission_id: MissionId, round_num: u32, feedback: Option<String>) -> Result<()> {
        Ok(self.controller.unified_resume(mission_id, round_num, feedback).await?)
    }

    /// Re-registers a mission rehydrated from persistence (its frozen
    /// settings and in-memory state) so the controller can run it again.
    pub async fn rehydrate(&self, mission_id: MissionId) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let record = persistence.get_mission(mission_id).await?;
        let settings: MissionSettings = serde_json::from_value(record.settings_snapshot.clone())?;
        self.controller.register_settings(mission_id, settings);
        let state = persistence.load_mission_state(mission_id).await?;
        self.context.load(state).await;
        Ok(())
    }

    /// Current lifecycle status.
    pub async fn get_status(&self, mission_id: MissionId) -> Result<MissionStatus> {
        Ok(self.context.snapshot(mission_id).await?.status)
    }

    /// The current outline.
    pub async fn get_plan(&self, mission_id: MissionId) -> Result<Vec<maestro_context::Section>> {
        Ok(self.context.snapshot(mission_id).await?.outline)
    }

    /// Every outline revision so far, oldest first.
    pub async fn get_outline_history(&self, mission_id: MissionId) -> Result<Vec<OutlineHistoryEntry>> {
        Ok(self.context.snapshot(mission_id).await?.outline_history)
    }

    /// Notes gathered so far, in insertion order.
    pub async fn get_notes(&self, mission_id: MissionId) -> Result<Vec<Note>> {
        Ok(self.context.snapshot(mission_id).await?.notes)
    }

    /// Append-only log lines.
    pub async fn get_logs(&self, mission_id: MissionId) -> Result<Vec<LogEntry>> {
        Ok(self.context.snapshot(mission_id).await?.logs)
    }

    /// The Planner's goal pad.
    pub async fn get_goals(&self, mission_id: MissionId) -> Result<Vec<GoalEntry>> {
        Ok(self.context.snapshot(mission_id).await?.goals)
    }

    /// The latest rendered report, if any.
    pub async fn get_report(&self, mission_id: MissionId) -> Result<ReportVersion> {
        self.context
            .snapshot(mission_id)
            .await?
            .latest_report_version()
            .cloned()
            .ok_or(EngineError::NoReport(mission_id))
    }

    /// Every rendered report version, oldest first.
    pub async fn list_report_versions(&self, mission_id: MissionId) -> Result<Vec<ReportVersion>> {
        Ok(self.context.snapshot(mission_id).await?.report_versions)
    }

    /// The frozen settings a mission was created with.
    pub fn get_comprehensive_settings(&self, mission_id: MissionId) -> Result<MissionSettings> {
        Ok(self.controller.settings_snapshot(mission_id)?)
    }

    /// The mission's full in-memory working state, for callers that need
    /// more than one projection of it at once.
    pub async fn get_context(&self, mission_id: MissionId) -> Result<maestro_context::MissionState> {
        Ok(self.context.snapshot(mission_id).await?)
    }

    /// Subscribes to a mission's live event stream on `topic`.
    #[must_use]
    pub fn subscribe(&self, mission_id: MissionId, topic: Topic) -> Subscription {
        self.bus.subscribe(mission_id, topic)
    }

    /// Lists missions from the relational store, most recent first. Returns
    /// an empty page when the engine has no persistence configured.
    pub async fn list_missions(&self, pagination: Pagination) -> Result<Vec<maestro_persistence::MissionRecord>> {
        match &self.persistence {
            Some(persistence) => Ok(persistence.list_missions(pagination).await?),
            None => Ok(Vec::new()),
        }
    }
}

//! [`MissionController`]: drives a mission through
//! `pending → planning → running → {paused, stopped, failed, completed}`,
//! bounding in-flight capability calls with a semaphore and checking a
//! cooperative cancellation flag at every phase boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use maestro_agents::{AgentError, Planner, Reflector, ReflectionOutcome, Researcher, Writer};
use maestro_bus::{EventBus, Topic};
use maestro_context::{LogEntry, LogLevel, MissionContextStore, MissionStatus, Note, ResearchStrategy, Section, ThoughtEntry};
use maestro_core::{CapabilityError, LLMClient, LogId, MissionId, MissionSettings, SectionId};
use maestro_retriever::{RetrieverError, RetrieverExecutor};
use maestro_telemetry::CostTrackingLlmClient;
use parking_lot::RwLock;
use tokio::sync::Semaphore;

use crate::error::{ControllerError, Result};
use crate::request::{build_settings, CreateMissionRequest};

/// A mission's cooperative interrupt flags. Checked between phases and
/// between research cycles rather than aborting mid-call, so a cancelled or
/// paused mission always leaves its context store in a consistent state.
struct MissionFlags {
    cancel: AtomicBool,
    pause: AtomicBool,
}

impl MissionFlags {
    fn new() -> Self {
        Self { cancel: AtomicBool::new(false), pause: AtomicBool::new(false) }
    }
}

#[derive(Default)]
struct SectionRoundResult {
    gaps: Vec<String>,
    new_sections: Vec<Section>,
}

/// Orchestrates the Planner → Researcher/Reflector → Writer pipeline for
/// every mission the engine owns.
///
/// Generic over `L`, the underlying LLM provider adapter; every call an
/// agent makes through this controller is wrapped in
/// [`maestro_telemetry::CostTrackingLlmClient`] so `mission.stats` stays
/// accurate without the agents themselves knowing about telemetry.
pub struct MissionController<L: LLMClient> {
    context: Arc<MissionContextStore>,
    bus: Arc<EventBus>,
    retriever: Arc<RetrieverExecutor>,
    llm: Arc<L>,
    planner: Arc<dyn Planner>,
    researcher: Arc<dyn Researcher>,
    reflector: Arc<dyn Reflector>,
    writer: Arc<dyn Writer>,
    semaphore: Arc<Semaphore>,
    flags: RwLock<HashMap<MissionId, Arc<MissionFlags>>>,
    settings: RwLock<HashMap<MissionId, MissionSettings>>,
}

impl<L: LLMClient> std::fmt::Debug for MissionController<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionController").field("missions", &self.flags.read().len()).finish()
    }
}

impl<L: LLMClient + Send + Sync + 'static> MissionController<L> {
    /// Builds a controller. `max_concurrent_requests` sizes the semaphore
    /// every research/writing task acquires a permit from before making a
    /// capability call, bounding global in-flight work for this process.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: Arc<MissionContextStore>,
        bus: Arc<EventBus>,
        retriever: Arc<RetrieverExecutor>,
        llm: Arc<L>,
        planner: Arc<dyn Planner>,
        researcher: Arc<dyn Researcher>,
        reflector: Arc<dyn Reflector>,
        writer: Arc<dyn Writer>,
        max_concurrent_requests: u32,
    ) -> Self {
        Self {
            context,
            bus,
            retriever,
            llm,
            planner,
            researcher,
            reflector,
            writer,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1) as usize)),
            flags: RwLock::new(HashMap::new()),
            settings: RwLock::new(HashMap::new()),
        }
    }

    fn flags_for(&self, mission_id: MissionId) -> Arc<MissionFlags> {
        if let Some(flags) = self.flags.read().get(&mission_id) {
            return Arc::clone(flags);
        }
        let mut flags = self.flags.write();
        Arc::clone(flags.entry(mission_id).or_insert_with(|| Arc::new(MissionFlags::new())))
    }

    fn settings_for(&self, mission_id: MissionId) -> Result<MissionSettings> {
        self.settings.read().get(&mission_id).cloned().ok_or(ControllerError::UnknownMission { mission_id })
    }

    /// Registers the frozen settings for a mission the controller didn't
    /// create itself, e.g. one rehydrated from `maestro-persistence` at
    /// process startup.
    pub fn register_settings(&self, mission_id: MissionId, settings: MissionSettings) {
        self.settings.write().insert(mission_id, settings);
    }

    /// Returns the frozen settings a mission was created with, for a caller
    /// (e.g. the root facade) that needs to persist or display them.
    pub fn settings_snapshot(&self, mission_id: MissionId) -> Result<MissionSettings> {
        self.settings_for(mission_id)
    }

    /// Creates a brand-new mission in `pending` and returns its id. Does not
    /// start it; call [`MissionController::start`] separately.
    pub async fn create_mission(&self, request: CreateMissionRequest) -> MissionId {
        let mission_id = MissionId::new();
        let settings = build_settings(request.settings_overrides.as_ref());
        self.register_settings(mission_id, settings);
        self.context.create_mission(mission_id, request.query).await;
        self.context
            .append_log(
                mission_id,
                LogEntry {
                    id: LogId::new(),
                    level: LogLevel::Info,
                    agent: Some("controller".into()),
                    message: format!("mission created for user {}", request.user_id),
                },
            )
            .await;
        self.context.flush(mission_id).await.ok();
        mission_id
    }

    /// Starts a `pending` mission's run loop in the background.
    pub async fn start(self: &Arc<Self>, mission_id: MissionId) -> Result<()> {
        let snapshot = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        if snapshot.status != MissionStatus::Pending {
            return Err(ControllerError::InvalidTransition { mission_id, status: snapshot.status });
        }
        self.spawn_run(mission_id, 1, None);
        Ok(())
    }

    /// Requests cooperative cancellation. Returns immediately; the mission
    /// transitions to `stopped` at its next checkpoint.
    pub async fn stop(&self, mission_id: MissionId) -> Result<()> {
        self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        self.flags_for(mission_id).cancel.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Requests a cooperative pause. Returns immediately; the mission
    /// transitions to `paused` at its next checkpoint.
    pub async fn pause(&self, mission_id: MissionId) -> Result<()> {
        let snapshot = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        if snapshot.status.is_terminal() {
            return Err(ControllerError::InvalidTransition { mission_id, status: snapshot.status });
        }
        self.flags_for(mission_id).pause.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Resumes a `paused` mission from where it left off.
    pub async fn resume(self: &Arc<Self>, mission_id: MissionId) -> Result<()> {
        let snapshot = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        if snapshot.status != MissionStatus::Paused {
            return Err(ControllerError::InvalidTransition { mission_id, status: snapshot.status });
        }
        let flags = self.flags_for(mission_id);
        flags.cancel.store(false, Ordering::SeqCst);
        flags.pause.store(false, Ordering::SeqCst);
        #[allow(clippy::cast_possible_truncation)]
        let round = snapshot.outline_history.len().max(1) as u32;
        self.context.set_status(mission_id, MissionStatus::Running).await;
        self.spawn_run(mission_id, round, None);
        Ok(())
    }

    /// Resumes any resumable mission (`paused`, `stopped`, `failed`, or even
    /// `completed`, to extend an already-finished report) from `round_num`,
    /// replanning with `feedback` folded into the Planner's prompt.
    pub async fn unified_resume(self: &Arc<Self>, mission_id: MissionId, round_num: u32, feedback: Option<String>) -> Result<()> {
        let snapshot = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        if !snapshot.status.is_resumable() {
            return Err(ControllerError::InvalidTransition { mission_id, status: snapshot.status });
        }
        let flags = self.flags_for(mission_id);
        flags.cancel.store(false, Ordering::SeqCst);
        flags.pause.store(false, Ordering::SeqCst);
        self.context.set_status(mission_id, MissionStatus::Planning).await;
        self.spawn_run(mission_id, round_num.max(1), feedback);
        Ok(())
    }

    fn spawn_run(self: &Arc<Self>, mission_id: MissionId, start_round: u32, feedback: Option<String>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = this.run(mission_id, start_round, feedback).await {
                tracing::error!(%mission_id, %err, "mission run loop exited with an error");
            }
        });
    }

    async fn mark_stopped(&self, mission_id: MissionId, round: u32) {
        self.context
            .append_log(
                mission_id,
                LogEntry { id: LogId::new(), level: LogLevel::Info, agent: Some("controller".into()), message: format!("stopped_at_round_{round}") },
            )
            .await;
        self.context.set_status(mission_id, MissionStatus::Stopped).await;
        self.context.flush(mission_id).await.ok();
        self.bus.publish(mission_id, Topic::Status, &serde_json::json!({"status": "stopped", "round": round}));
    }

    async fn mark_paused(&self, mission_id: MissionId, round: u32) {
        self.context
            .append_log(
                mission_id,
                LogEntry { id: LogId::new(), level: LogLevel::Info, agent: Some("controller".into()), message: format!("paused_at_round_{round}") },
            )
            .await;
        self.context.set_status(mission_id, MissionStatus::Paused).await;
        self.context.flush(mission_id).await.ok();
        self.bus.publish(mission_id, Topic::Status, &serde_json::json!({"status": "paused", "round": round}));
    }

    /// Returns `true` (and leaves the mission in its post-interrupt status)
    /// if a stop or pause request is pending.
    async fn check_interrupt(&self, mission_id: MissionId, round: u32) -> bool {
        let flags = self.flags_for(mission_id);
        if flags.cancel.load(Ordering::SeqCst) {
            self.mark_stopped(mission_id, round).await;
            return true;
        }
        if flags.pause.load(Ordering::SeqCst) {
            self.mark_paused(mission_id, round).await;
            return true;
        }
        false
    }

    async fn run(&self, mission_id: MissionId, start_round: u32, feedback: Option<String>) -> Result<()> {
        match self.run_inner(mission_id, start_round, feedback).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.context.set_status(mission_id, MissionStatus::Failed).await;
                self.context
                    .append_log(
                        mission_id,
                        LogEntry { id: LogId::new(), level: LogLevel::Error, agent: Some("controller".into()), message: err.to_string() },
                    )
                    .await;
                self.context.flush(mission_id).await.ok();
                self.bus.publish(mission_id, Topic::Status, &serde_json::json!({"status": "failed", "detail": err.to_string()}));
                Err(err)
            }
        }
    }

    async fn run_inner(&self, mission_id: MissionId, start_round: u32, mut feedback: Option<String>) -> Result<()> {
        let settings = self.settings_for(mission_id)?;
        let llm = CostTrackingLlmClient::new(Arc::clone(&self.llm), Arc::clone(&self.context), Arc::clone(&self.bus), mission_id);

        self.context.set_status(mission_id, MissionStatus::Planning).await;
        self.bus.publish(mission_id, Topic::Status, &serde_json::json!({"status": "planning"}));

        let last_round = settings.structured_research_rounds.max(start_round);
        for round in start_round..=last_round {
            if self.check_interrupt(mission_id, round).await {
                return Ok(());
            }

            let prior = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
            let revision_allowed = round < last_round && !settings.skip_final_replanning;

            let sections = match call_with_retry("planner", || {
                self.planner.plan(
                    &llm,
                    &prior.query,
                    &prior.outline,
                    &prior.goals,
                    feedback.as_deref(),
                    settings.initial_research_max_depth,
                    settings.initial_research_max_questions,
                )
            })
            .await
            {
                Ok(sections) => sections,
                Err(ControllerError::Validation { detail, .. } | ControllerError::Budget { detail }) if !prior.outline.is_empty() => {
                    tracing::warn!(%detail, round, "planner revision failed, keeping prior outline");
                    prior.outline.clone()
                }
                Err(other) => return Err(other),
            };

            self.context.snapshot_outline(mission_id, round, sections.clone()).await;
            self.context.set_status(mission_id, MissionStatus::Running).await;
            self.bus.publish(mission_id, Topic::Plan, &serde_json::json!({"round": round, "section_count": sections.len()}));

            let levels = levelize(&sections)
                .ok_or_else(|| ControllerError::Fatal { agent: "controller", source: anyhow::anyhow!("outline has a dependency cycle") })?;

            let mut round_gaps = Vec::new();
            for level in levels {
                if self.check_interrupt(mission_id, round).await {
                    return Ok(());
                }
                let state = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
                let level_sections: Vec<Section> = level.into_iter().filter_map(|id| state.section(id).cloned()).collect();

                let tasks = level_sections.into_iter().map(|section| {
                    let llm = &llm;
                    let settings = &settings;
                    async move {
                        let _permit = self.semaphore.acquire().await.expect("semaphore is never closed");
                        self.process_section_research(mission_id, llm, settings, section, revision_allowed).await
                    }
                });
                let results = futures::future::join_all(tasks).await;

                let mut new_sections = Vec::new();
                for result in results {
                    let outcome = result?;
                    round_gaps.extend(outcome.gaps);
                    new_sections.extend(outcome.new_sections);
                }
                if !new_sections.is_empty() {
                    let mut grown = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?.outline;
                    grown.extend(new_sections);
                    self.context.snapshot_outline(mission_id, round, grown).await;
                }
            }
            feedback = if round_gaps.is_empty() { None } else { Some(round_gaps.join("; ")) };
        }

        if self.check_interrupt(mission_id, last_round).await {
            return Ok(());
        }
        self.write_report(mission_id, &llm, &settings).await?;

        self.context.set_status(mission_id, MissionStatus::Completed).await;
        self.context.flush(mission_id).await.ok();
        self.bus.publish(mission_id, Topic::Status, &serde_json::json!({"status": "completed"}));
        Ok(())
    }

    async fn process_section_research(
        &self,
        mission_id: MissionId,
        llm: &impl LLMClient,
        settings: &MissionSettings,
        section: Section,
        revision_allowed: bool,
    ) -> Result<SectionRoundResult> {
        if matches!(section.research_strategy, ResearchStrategy::Synthesize) {
            return Ok(SectionRoundResult::default());
        }
        let flags = self.flags_for(mission_id);
        let mut cycle = 1;
        while cycle <= settings.max_research_cycles_per_section {
            if flags.cancel.load(Ordering::SeqCst) || flags.pause.load(Ordering::SeqCst) {
                break;
            }
            let state = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
            let existing_notes: Vec<Note> = state.notes_for_section(section.id).into_iter().cloned().collect();
            let recent = recent_thoughts(&state.thoughts, settings.thought_pad_context_limit);

            #[allow(clippy::cast_possible_truncation)]
            let top_k_per_query = settings.main_research_doc_results.max(settings.main_research_web_results) as usize;
            match call_with_retry("researcher", || {
                self.researcher.research_cycle(
                    llm,
                    &self.retriever,
                    &section,
                    &state.goals,
                    &recent,
                    &existing_notes,
                    cycle,
                    settings.max_research_cycles_per_section,
                    settings.max_suggestions_per_batch,
                    top_k_per_query,
                    settings.min_notes_per_section_assignment,
                    settings.max_notes_per_section_assignment,
                )
            })
            .await
            {
                Ok(outcome) => {
                    for note in outcome.notes {
                        self.context.append_note(mission_id, note).await;
                    }
                    if outcome.saturated {
                        break;
                    }
                }
                Err(ControllerError::Budget { detail }) => {
                    tracing::info!(%detail, section = %section.title, "research budget exhausted, saturating section");
                    break;
                }
                Err(ControllerError::Validation { detail, .. }) => {
                    tracing::warn!(%detail, section = %section.title, "researcher produced an invalid artefact, skipping cycle");
                    break;
                }
                Err(other) => return Err(other),
            }
            cycle += 1;
        }

        if flags.cancel.load(Ordering::SeqCst) || flags.pause.load(Ordering::SeqCst) {
            return Ok(SectionRoundResult::default());
        }

        let state = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
        let notes: Vec<Note> = state.notes_for_section(section.id).into_iter().cloned().collect();
        let reflection = match call_with_retry("reflector", || {
            self.reflector.reflect(llm, &section, &notes, &state.thoughts, settings.thought_pad_context_limit, revision_allowed)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(ControllerError::Budget { detail } | ControllerError::Validation { detail, .. }) => {
                tracing::warn!(%detail, section = %section.title, "reflector step failed, treating section as sufficient");
                ReflectionOutcome { sufficient: true, gaps: Vec::new(), refinement_queries: Vec::new(), new_sections: Vec::new() }
            }
            Err(other) => return Err(other),
        };
        Ok(SectionRoundResult { gaps: reflection.gaps, new_sections: reflection.new_sections })
    }

    async fn write_report(&self, mission_id: MissionId, llm: &impl LLMClient, settings: &MissionSettings) -> Result<()> {
        for pass in 1..=settings.writing_passes {
            if self.check_interrupt(mission_id, 0).await {
                return Ok(());
            }
            let state = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
            let levels = levelize(&state.outline)
                .ok_or_else(|| ControllerError::Fatal { agent: "controller", source: anyhow::anyhow!("outline has a dependency cycle") })?;
            let previous_markdown = state.latest_report_version().map(|v| v.markdown.clone());

            let mut rendered: HashMap<SectionId, String> = HashMap::new();
            for level in levels {
                if self.check_interrupt(mission_id, 0).await {
                    return Ok(());
                }
                let state = self.context.snapshot(mission_id).await.map_err(|_| ControllerError::UnknownMission { mission_id })?;
                let level_sections: Vec<Section> = level.into_iter().filter_map(|id| state.section(id).cloned()).collect();
                let previous_content = previous_markdown.as_deref();

                let tasks = level_sections.into_iter().map(|section| {
                    let notes: Vec<Note> = state.notes_for_section(section.id).into_iter().cloned().collect();
                    async move {
                        let _permit = self.semaphore.acquire().await.expect("semaphore is never closed");
                        match call_with_retry("writer", || {
                            self.writer.write_section(llm, &section, &notes, previous_content, settings.writing_previous_content_preview_chars)
                        })
                        .await
                        {
                            Ok(body) => Ok(Some((section.id, body))),
                            Err(ControllerError::Validation { detail, .. } | ControllerError::Budget { detail }) => {
                                tracing::warn!(%detail, section = %section.title, "skipping section, writer could not produce valid content");
                                Ok(None)
                            }
                            Err(other) => Err(other),
                        }
                    }
                });
                for result in futures::future::join_all(tasks).await {
                    if let Some((id, body)) = result? {
                        rendered.insert(id, body);
                    }
                }
            }

            let markdown = render_markdown(&state.outline, &rendered);
            self.context.save_report_version(mission_id, markdown, Some(format!("writing pass {pass}"))).await;
            self.bus.publish(mission_id, Topic::Draft, &serde_json::json!({"pass": pass}));
            self.context.flush(mission_id).await.ok();
        }
        Ok(())
    }
}

fn recent_thoughts(thoughts: &[ThoughtEntry], window: u32) -> Vec<ThoughtEntry> {
    let window = window as usize;
    if thoughts.len() <= window {
        thoughts.to_vec()
    } else {
        thoughts[thoughts.len() - window..].to_vec()
    }
}

fn render_markdown(outline: &[Section], rendered: &HashMap<SectionId, String>) -> String {
    let mut ordered: Vec<&Section> = outline.iter().collect();
    ordered.sort_by_key(|s| s.order);
    let mut out = String::new();
    for section in ordered {
        out.push_str("## ");
        out.push_str(&section.title);
        out.push_str("\n\n");
        if let Some(body) = rendered.get(&section.id) {
            out.push_str(body);
            out.push_str("\n\n");
        }
    }
    out
}

/// Groups sections into waves respecting `depends_on`: every section in
/// level `n` only depends on sections in levels `< n`, so a caller can run
/// each level's sections concurrently. Returns `None` on a dependency cycle
/// or a dangling reference, mirroring `MissionState::topological_sections`.
fn levelize(sections: &[Section]) -> Option<Vec<Vec<SectionId>>> {
    let mut remaining: Vec<&Section> = sections.iter().collect();
    let mut done = std::collections::HashSet::new();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let (ready, not_ready): (Vec<&Section>, Vec<&Section>) =
            remaining.into_iter().partition(|s| s.depends_on.iter().all(|dep| done.contains(dep)));
        if ready.is_empty() {
            return None;
        }
        for section in &ready {
            done.insert(section.id);
        }
        levels.push(ready.iter().map(|s| s.id).collect());
        remaining = not_ready;
    }
    Some(levels)
}

fn classify(agent: &'static str, err: AgentError) -> ControllerError {
    match err {
        AgentError::Capability { source: CapabilityError::NoEvidence, .. } => {
            ControllerError::Budget { detail: format!("{agent}: no evidence available") }
        }
        AgentError::Capability { source, .. } => ControllerError::Transient { agent, detail: source.to_string() },
        AgentError::Retrieval { source: RetrieverError::NoEvidence, .. } => {
            ControllerError::Budget { detail: format!("{agent}: no evidence available") }
        }
        AgentError::Retrieval { source, .. } => ControllerError::Transient { agent, detail: source.to_string() },
        AgentError::Validation { detail, .. } => ControllerError::Validation { agent, detail },
    }
}

/// Retries a transient agent-step failure up to 3 attempts with jittered
/// exponential backoff; a validation or budget failure is returned
/// immediately for the caller to handle (repair attempts already happened
/// inside the agent itself).
async fn call_with_retry<T, Fut>(agent: &'static str, mut attempt: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::Future<Output = maestro_agents::Result<T>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    let mut last_detail = String::new();
    for try_num in 0..MAX_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => match classify(agent, err) {
                ControllerError::Transient { detail, .. } => {
                    last_detail = detail;
                    if try_num + 1 < MAX_ATTEMPTS {
                        let backoff = jittered_backoff_ms(try_num);
                        tracing::warn!(agent, attempt = try_num + 1, backoff_ms = backoff, "transient failure, retrying");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                    }
                }
                other => return Err(other),
            },
        }
    }
    Err(ControllerError::Fatal { agent, source: anyhow::anyhow!(last_detail) })
}

fn jittered_backoff_ms(attempt: u32) -> u64 {
    let base = 200u64.saturating_mul(1u64 << attempt.min(4));
    base + rand::random::<u64>() % 100
}

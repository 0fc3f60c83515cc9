//! End-to-end lifecycle scenarios driven straight against
//! `maestro_controller::MissionController`, the same way `rag/src/rag.rs`
//! drives its index through hand-written fakes rather than a mocking
//! framework. The agent roster here is a set of deterministic test doubles
//! implementing the real `Planner`/`Researcher`/`Reflector`/`Writer` traits,
//! so these tests exercise the actual state machine, retry, and
//! classification logic without depending on an LLM provider.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use maestro_agents::{AgentError, Planner, Reflector, ReflectionOutcome, Researcher, ResearchCycleOutcome, Writer};
use maestro_bus::EventBus;
use maestro_context::{GoalEntry, MissionContextStore, MissionStatus, Note, ResearchStrategy, Section, ThoughtEntry};
use maestro_controller::{ControllerError, CreateMissionRequest, MissionController};
use maestro_core::{CapabilityError, Completion, CompletionParams, LLMClient, MissionId, ModelRole, SectionId, TokenUsage};
use maestro_retriever::{RetrieverError, RetrieverExecutor};

struct FakeLlm;

#[async_trait]
impl LLMClient for FakeLlm {
    async fn complete(&self, _role: ModelRole, _prompt: &str, _params: &CompletionParams) -> maestro_core::Result<Completion> {
        Ok(Completion { text: String::new(), usage: TokenUsage::default(), cost_usd: 0.0 })
    }
}

fn one_section() -> Section {
    Section {
        id: SectionId::new(),
        parent_id: None,
        title: "Overview".into(),
        brief: "Summarize the topic".into(),
        order: 0,
        research_strategy: ResearchStrategy::ResearchThenSynthesize,
        depends_on: Vec::new(),
        assigned: false,
    }
}

/// Succeeds immediately, always proposing the same single-section outline.
struct SteadyPlanner;

#[async_trait]
impl Planner for SteadyPlanner {
    async fn plan(
        &self,
        _llm: &dyn LLMClient,
        _request: &str,
        prior_outline: &[Section],
        _goal_pad: &[GoalEntry],
        _feedback: Option<&str>,
        _max_depth: u32,
        _max_questions: u32,
    ) -> maestro_agents::Result<Vec<Section>> {
        if prior_outline.is_empty() {
            Ok(vec![one_section()])
        } else {
            Ok(prior_outline.to_vec())
        }
    }
}

/// Proposes a single section on its first call; once feedback is present,
/// appends a second section addressing it while keeping the original.
struct FeedbackAwarePlanner;

#[async_trait]
impl Planner for FeedbackAwarePlanner {
    async fn plan(
        &self,
        _llm: &dyn LLMClient,
        _request: &str,
        prior_outline: &[Section],
        _goal_pad: &[GoalEntry],
        feedback: Option<&str>,
        _max_depth: u32,
        _max_questions: u32,
    ) -> maestro_agents::Result<Vec<Section>> {
        if let Some(note) = feedback {
            let mut revised = prior_outline.to_vec();
            revised.push(Section {
                id: SectionId::new(),
                parent_id: None,
                title: "Consensus protocols".into(),
                brief: note.to_string(),
                order: revised.len() as u32,
                research_strategy: ResearchStrategy::ResearchThenSynthesize,
                depends_on: Vec::new(),
                assigned: false,
            });
            Ok(revised)
        } else if prior_outline.is_empty() {
            Ok(vec![one_section()])
        } else {
            Ok(prior_outline.to_vec())
        }
    }
}

/// Fails with a transient capability error for its first `fail_count` calls,
/// then behaves like [`SteadyPlanner`].
struct FlakyPlanner {
    calls: AtomicU32,
    fail_count: u32,
}

impl FlakyPlanner {
    fn new(fail_count: u32) -> Self {
        Self { calls: AtomicU32::new(0), fail_count }
    }
}

#[async_trait]
impl Planner for FlakyPlanner {
    async fn plan(
        &self,
        llm: &dyn LLMClient,
        request: &str,
        prior_outline: &[Section],
        goal_pad: &[GoalEntry],
        feedback: Option<&str>,
        max_depth: u32,
        max_questions: u32,
    ) -> maestro_agents::Result<Vec<Section>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_count {
            return Err(AgentError::Capability { agent: "planner", source: CapabilityError::Provider(anyhow::anyhow!("provider hiccup")) });
        }
        SteadyPlanner.plan(llm, request, prior_outline, goal_pad, feedback, max_depth, max_questions).await
    }
}

/// Immediately saturates every section with one note.
struct SteadyResearcher;

#[async_trait]
impl Researcher for SteadyResearcher {
    #[allow(clippy::too_many_arguments)]
    async fn research_cycle(
        &self,
        _llm: &dyn LLMClient,
        _retriever: &RetrieverExecutor,
        section: &Section,
        _goal_pad: &[GoalEntry],
        _recent_thoughts: &[ThoughtEntry],
        _existing_notes: &[Note],
        _cycle: u32,
        _max_cycles: u32,
        _max_queries: u32,
        _top_k_per_query: usize,
        _min_notes: u32,
        _max_notes_per_cycle: u32,
    ) -> maestro_agents::Result<ResearchCycleOutcome> {
        Ok(ResearchCycleOutcome {
            notes: vec![Note { id: maestro_core::NoteId::new(), section_id: Some(section.id), text: "a cited claim".into(), citations: vec!["E1".into()] }],
            saturated: true,
        })
    }
}

/// Every research cycle comes back with no evidence available.
struct StarvedResearcher;

#[async_trait]
impl Researcher for StarvedResearcher {
    #[allow(clippy::too_many_arguments)]
    async fn research_cycle(
        &self,
        _llm: &dyn LLMClient,
        _retriever: &RetrieverExecutor,
        _section: &Section,
        _goal_pad: &[GoalEntry],
        _recent_thoughts: &[ThoughtEntry],
        _existing_notes: &[Note],
        _cycle: u32,
        _max_cycles: u32,
        _max_queries: u32,
        _top_k_per_query: usize,
        _min_notes: u32,
        _max_notes_per_cycle: u32,
    ) -> maestro_agents::Result<ResearchCycleOutcome> {
        Err(AgentError::Retrieval { agent: "researcher", source: RetrieverError::NoEvidence })
    }
}

/// Always judges a section sufficient, proposing no new subsections.
struct ContentReflector;

#[async_trait]
impl Reflector for ContentReflector {
    async fn reflect(
        &self,
        _llm: &dyn LLMClient,
        _section: &Section,
        _notes: &[Note],
        _thought_pad: &[ThoughtEntry],
        _thought_window: u32,
        _revision_allowed: bool,
    ) -> maestro_agents::Result<ReflectionOutcome> {
        Ok(ReflectionOutcome { sufficient: true, gaps: Vec::new(), refinement_queries: Vec::new(), new_sections: Vec::new() })
    }
}

/// Renders a fixed, deterministic body per section.
struct PlainWriter;

#[async_trait]
impl Writer for PlainWriter {
    async fn write_section(
        &self,
        _llm: &dyn LLMClient,
        section: &Section,
        _notes: &[Note],
        _previous_content: Option<&str>,
        _previous_preview_chars: u32,
    ) -> maestro_agents::Result<String> {
        Ok(format!("Body text for {}.", section.title))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_controller(
    planner: Arc<dyn Planner>,
    researcher: Arc<dyn Researcher>,
) -> (Arc<MissionController<FakeLlm>>, Arc<MissionContextStore>) {
    let context = Arc::new(MissionContextStore::new());
    let bus = Arc::new(EventBus::new(maestro_bus::DEFAULT_TOPIC_CAPACITY));
    let retriever = Arc::new(RetrieverExecutor::new(Vec::new()));
    let controller = Arc::new(MissionController::new(
        Arc::clone(&context),
        bus,
        retriever,
        Arc::new(FakeLlm),
        planner,
        researcher,
        Arc::new(ContentReflector) as Arc<dyn Reflector>,
        Arc::new(PlainWriter) as Arc<dyn Writer>,
        4,
    ));
    (controller, context)
}

async fn wait_until(context: &MissionContextStore, mission_id: MissionId, mut predicate: impl FnMut(MissionStatus) -> bool) -> MissionStatus {
    for _ in 0..500 {
        let status = context.snapshot(mission_id).await.expect("mission exists").status;
        if predicate(status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("status predicate was never satisfied");
}

#[tokio::test(flavor = "multi_thread")]
async fn happy_path_reaches_completed_with_a_rendered_report() {
    let (controller, context) = build_controller(Arc::new(SteadyPlanner), Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();

    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);

    let state = context.snapshot(mission_id).await.unwrap();
    let report = state.latest_report_version().expect("a report was rendered");
    assert!(report.markdown.contains("Overview"));
    assert!(report.markdown.contains("Body text for Overview."));
}

#[tokio::test(flavor = "multi_thread")]
async fn unified_resume_with_feedback_revises_the_outline_and_reports() {
    let (controller, context) = build_controller(Arc::new(FeedbackAwarePlanner), Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "summarise the CAP theorem".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();
    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);

    let first_pass = context.snapshot(mission_id).await.unwrap();
    assert_eq!(first_pass.outline.len(), 1);
    let first_version = first_pass.latest_report_version().expect("a report was rendered").version;

    controller.unified_resume(mission_id, 1, Some("add a section on consensus protocols".into())).await.unwrap();
    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);

    let revised = context.snapshot(mission_id).await.unwrap();
    assert_eq!(revised.outline.len(), 2, "feedback should add a section without dropping the original");
    assert!(revised.outline.iter().any(|s| s.title == "Consensus protocols"));
    assert!(revised.notes.iter().any(|n| n.section_id == Some(first_pass.outline[0].id)), "notes from the surviving section must be retained");

    let versions = &revised.report_versions;
    let current = revised.latest_report_version().expect("a revised report was rendered");
    assert!(current.version > first_version);
    assert!(current.is_current);
    assert_eq!(versions.iter().filter(|v| v.is_current).count(), 1, "exactly one report version must be current");
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_request_halts_the_mission_cooperatively() {
    let (controller, context) = build_controller(Arc::new(SteadyPlanner), Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();
    controller.stop(mission_id).await.unwrap();

    let status = wait_until(&context, mission_id, |s| s.is_terminal() || s == MissionStatus::Failed).await;
    assert_eq!(status, MissionStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_then_resume_completes_the_mission() {
    let (controller, context) = build_controller(Arc::new(SteadyPlanner), Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();
    controller.pause(mission_id).await.unwrap();

    let paused = wait_until(&context, mission_id, |s| s == MissionStatus::Paused).await;
    assert_eq!(paused, MissionStatus::Paused);

    controller.resume(mission_id).await.unwrap();
    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_planner_failures_are_retried_before_giving_up() {
    let flaky = Arc::new(FlakyPlanner::new(2));
    let (controller, context) = build_controller(flaky, Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();

    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn research_budget_exhaustion_saturates_instead_of_failing() {
    let (controller, context) = build_controller(Arc::new(SteadyPlanner), Arc::new(StarvedResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();

    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);

    let state = context.snapshot(mission_id).await.unwrap();
    assert!(state.notes.is_empty(), "a starved researcher should leave the section without notes, not invent any");
}

#[tokio::test(flavor = "multi_thread")]
async fn a_failed_mission_can_be_resumed_once_the_cause_clears() {
    let flaky = Arc::new(FlakyPlanner::new(3));
    let (controller, context) = build_controller(Arc::clone(&flaky) as Arc<dyn Planner>, Arc::new(SteadyResearcher));
    let mission_id = controller
        .create_mission(CreateMissionRequest { query: "survey quantum annealing".into(), user_id: "u1".into(), settings_overrides: None })
        .await;
    controller.start(mission_id).await.unwrap();

    let failed = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(failed, MissionStatus::Failed, "exhausting every retry attempt should fail the mission");

    controller.unified_resume(mission_id, 1, None).await.unwrap();
    let status = wait_until(&context, mission_id, |s| matches!(s, MissionStatus::Completed | MissionStatus::Failed)).await;
    assert_eq!(status, MissionStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn a_request_against_an_unknown_mission_is_rejected() {
    let (controller, _context) = build_controller(Arc::new(SteadyPlanner), Arc::new(SteadyResearcher));
    let result = controller.start(MissionId::new()).await;
    assert!(matches!(result, Err(ControllerError::UnknownMission { .. })));
}

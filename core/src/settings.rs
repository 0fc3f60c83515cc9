//! [`MissionSettings`]: the full enumerated configuration frozen into a
//! mission record at creation (`spec.md` §6, "Mission settings").
//!
//! This lives in `maestro-core` rather than the root facade crate because
//! every layer above it — retriever, agents, controller — reads fields off
//! it; putting it here avoids a dependency edge pointing the wrong way.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::ModelRole;

/// Current schema version for [`MissionSettings`]. Bump this and add a
/// migration in `maestro-persistence` if a field is ever added or renamed.
pub const SETTINGS_VERSION: u32 = 1;

/// Which provider/model a [`ModelRole`] resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelBinding {
    /// Provider name, opaque to the engine (e.g. `"anthropic"`, `"openai"`).
    pub provider: String,
    /// Provider-specific model identifier.
    pub model: String,
}

/// Which search backend a mission's web channel should use, opaque to the
/// engine beyond its name.
pub type SearchProviderName = String;

/// The full set of mission settings, frozen into the mission record the
/// first time it leaves `pending`. See `spec.md` §6 for the authoritative
/// field list; this struct adds no fields beyond it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MissionSettings {
    /// Schema version this struct was serialized under.
    pub settings_version: u32,

    // --- Research ---
    /// Maximum outline depth the Planner may propose on the initial pass.
    pub initial_research_max_depth: u32,
    /// Maximum research questions the Planner may seed per section initially.
    pub initial_research_max_questions: u32,
    /// Number of Planner/Reflector revision rounds before writing begins.
    pub structured_research_rounds: u32,
    /// Research cycles allowed per leaf section before it is forced to saturate.
    pub max_research_cycles_per_section: u32,
    /// Hard ceiling on total research iterations across the whole mission.
    pub max_total_iterations: u32,
    /// Maximum outline tree depth, enforced by Planner validation.
    pub max_total_depth: u32,
    /// Maximum search queries a Researcher may emit in one batch.
    pub max_suggestions_per_batch: u32,

    // --- Writing ---
    /// Number of full outline rewrite passes the Writer performs.
    pub writing_passes: u32,
    /// Characters of the previous draft shown to the Writer as context.
    pub writing_previous_content_preview_chars: u32,
    /// Maximum characters of context a single Writer invocation may consume.
    pub writing_agent_max_context_chars: u32,

    // --- Retrieval ---
    /// Document-channel results requested during initial exploration.
    pub initial_exploration_doc_results: u32,
    /// Web-channel results requested during initial exploration.
    pub initial_exploration_web_results: u32,
    /// Document-channel results requested during main research cycles.
    pub main_research_doc_results: u32,
    /// Web-channel results requested during main research cycles.
    pub main_research_web_results: u32,

    // --- Notes ---
    /// Minimum notes a section needs before it can be considered saturated.
    pub min_notes_per_section_assignment: u32,
    /// Maximum notes a single research cycle may attach to a section.
    pub max_notes_per_section_assignment: u32,
    /// Maximum notes considered when reranking for section assignment.
    pub max_notes_for_assignment_reranking: u32,
    /// Character cap on a single note's markdown content.
    pub research_note_content_limit: u32,

    // --- Planning ---
    /// Character budget for context shown to the Planner.
    pub max_planning_context_chars: u32,
    /// Maximum thought-pad entries kept in context for any agent.
    pub thought_pad_context_limit: u32,

    // --- Performance ---
    /// Global cap on concurrent in-flight sections/requests.
    pub max_concurrent_requests: u32,
    /// Skips the final Reflector replanning pass before writing.
    pub skip_final_replanning: bool,
    /// Lets the controller auto-tune cycle/notes parameters mid-mission.
    pub auto_optimize_params: bool,

    // --- Tooling ---
    /// Whether the web retrieval channel is enabled.
    pub use_web_search: bool,
    /// Whether the local hybrid-index retrieval channel is enabled.
    pub use_local_rag: bool,
    /// Scopes document retrieval to a single ingestion group, if set.
    pub document_group_id: Option<String>,
    /// Which web search backend to use.
    pub search_provider: SearchProviderName,

    // --- Models ---
    /// Model bound to [`ModelRole::Fast`].
    pub fast_model: ModelBinding,
    /// Model bound to [`ModelRole::Mid`].
    pub mid_model: ModelBinding,
    /// Model bound to [`ModelRole::Intelligent`].
    pub intelligent_model: ModelBinding,
    /// Model bound to [`ModelRole::Verifier`].
    pub verifier_model: ModelBinding,
}

impl MissionSettings {
    /// Returns the [`ModelBinding`] configured for `role`.
    #[must_use]
    pub const fn model_for(&self, role: ModelRole) -> &ModelBinding {
        match role {
            ModelRole::Fast => &self.fast_model,
            ModelRole::Mid => &self.mid_model,
            ModelRole::Intelligent => &self.intelligent_model,
            ModelRole::Verifier => &self.verifier_model,
        }
    }
}

impl Default for MissionSettings {
    /// Conservative defaults sized for a single-section smoke-test mission;
    /// production deployments are expected to override most of these.
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            initial_research_max_depth: 2,
            initial_research_max_questions: 3,
            structured_research_rounds: 1,
            max_research_cycles_per_section: 2,
            max_total_iterations: 20,
            max_total_depth: 3,
            max_suggestions_per_batch: 3,
            writing_passes: 1,
            writing_previous_content_preview_chars: 2000,
            writing_agent_max_context_chars: 12_000,
            initial_exploration_doc_results: 5,
            initial_exploration_web_results: 5,
            main_research_doc_results: 5,
            main_research_web_results: 5,
            min_notes_per_section_assignment: 1,
            max_notes_per_section_assignment: 8,
            max_notes_for_assignment_reranking: 20,
            research_note_content_limit: 600,
            max_planning_context_chars: 8_000,
            thought_pad_context_limit: 20,
            max_concurrent_requests: 4,
            skip_final_replanning: false,
            auto_optimize_params: false,
            use_web_search: true,
            use_local_rag: true,
            document_group_id: None,
            search_provider: "default".to_string(),
            fast_model: ModelBinding { provider: "anthropic".into(), model: "claude-haiku".into() },
            mid_model: ModelBinding { provider: "anthropic".into(), model: "claude-sonnet".into() },
            intelligent_model: ModelBinding { provider: "anthropic".into(), model: "claude-opus".into() },
            verifier_model: ModelBinding { provider: "anthropic".into(), model: "claude-haiku".into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_internally_consistent() {
        let settings = MissionSettings::default();
        assert_eq!(settings.settings_version, SETTINGS_VERSION);
        assert!(settings.min_notes_per_section_assignment <= settings.max_notes_per_section_assignment);
    }

    #[test]
    fn model_for_resolves_every_role() {
        let settings = MissionSettings::default();
        assert_eq!(settings.model_for(ModelRole::Fast).model, "claude-haiku");
        assert_eq!(settings.model_for(ModelRole::Intelligent).model, "claude-opus");
    }

    #[test]
    fn round_trips_through_json() {
        let settings = MissionSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: MissionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_total_iterations, settings.max_total_iterations);
    }
}

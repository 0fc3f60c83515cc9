//! The Reflector: judges whether a section has enough evidence to write,
//! and may grow the outline with new subsections during an allowed revision
//! round (`spec.md` §4.4.3).

use askama::Template;
use async_trait::async_trait;
use maestro_context::{Note, ResearchStrategy, Section, ThoughtEntry};
use maestro_core::{CompletionParams, LLMClient, ModelRole, SectionId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::validate::validate_with_repair;

/// Prompt template version, logged on every Reflector invocation.
pub const PROMPT_VERSION: u32 = 1;

const AGENT_NAME: &str = "reflector";

#[derive(Template)]
#[template(path = "reflector.txt", escape = "none")]
struct ReflectorPrompt<'a> {
    section_title: &'a str,
    section_brief: &'a str,
    notes: String,
    thought_window: u32,
    thought_pad: String,
    revision_allowed: bool,
}

/// A new subsection the Reflector proposes to add under the reflected-on
/// section. Never reassigns an existing [`SectionId`] — it only grows the
/// tree, which keeps every already-gathered note's `section_id` valid.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct NewSubsection {
    /// Section heading.
    pub title: String,
    /// One-line brief describing what this subsection should cover.
    pub brief: String,
    /// How this subsection's content should be produced.
    pub research_strategy: ResearchStrategy,
}

/// The Reflector's raw output.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ReflectionDraft {
    /// Whether this section now has enough evidence to be written.
    pub sufficient: bool,
    /// Named gaps in the current evidence, if not sufficient.
    pub gaps: Vec<String>,
    /// Queries a Researcher should run next to close the gaps.
    pub refinement_queries: Vec<String>,
    /// New subsections to add under this section. Only honored when the
    /// round this reflection runs in allows outline revisions.
    pub new_subsections: Vec<NewSubsection>,
}

fn validate_reflection(draft: &ReflectionDraft, revision_allowed: bool) -> std::result::Result<(), String> {
    if !draft.sufficient && draft.gaps.is_empty() {
        return Err("an insufficient section must name at least one gap".to_string());
    }
    if !draft.new_subsections.is_empty() && !revision_allowed {
        return Err("outline revisions are not allowed in this round".to_string());
    }
    Ok(())
}

fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "(none yet)".to_string();
    }
    notes.iter().map(|n| format!("- {} (citations: {})", n.text, n.citations.join(", "))).collect::<Vec<_>>().join("\n")
}

fn render_thought_pad(thoughts: &[ThoughtEntry], window: u32) -> String {
    let tail: Vec<&ThoughtEntry> = thoughts.iter().rev().take(window as usize).collect();
    if tail.is_empty() {
        return "(none yet)".to_string();
    }
    tail.iter().rev().map(|t| format!("- {}", t.text)).collect::<Vec<_>>().join("\n")
}

/// The outcome of reflecting on one section.
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    /// Whether this section now has enough evidence to be written.
    pub sufficient: bool,
    /// Named gaps in the current evidence.
    pub gaps: Vec<String>,
    /// Queries a Researcher should run next.
    pub refinement_queries: Vec<String>,
    /// New child sections to append to the outline, if any were proposed
    /// and this round allowed revisions.
    pub new_sections: Vec<Section>,
}

/// Judges section sufficiency and proposes outline growth.
#[async_trait]
pub trait Reflector: Send + Sync {
    /// Reflects on `section` given its notes and the mission's thought pad.
    async fn reflect(
        &self,
        llm: &dyn LLMClient,
        section: &Section,
        notes: &[Note],
        thought_pad: &[ThoughtEntry],
        thought_window: u32,
        revision_allowed: bool,
    ) -> Result<ReflectionOutcome>;
}

/// The engine's standard Reflector.
#[derive(Debug, Default)]
pub struct DefaultReflector;

#[async_trait]
impl Reflector for DefaultReflector {
    async fn reflect(
        &self,
        llm: &dyn LLMClient,
        section: &Section,
        notes: &[Note],
        thought_pad: &[ThoughtEntry],
        thought_window: u32,
        revision_allowed: bool,
    ) -> Result<ReflectionOutcome> {
        let prompt = ReflectorPrompt {
            section_title: &section.title,
            section_brief: &section.brief,
            notes: render_notes(notes),
            thought_window,
            thought_pad: render_thought_pad(thought_pad, thought_window),
            revision_allowed,
        }
        .render()
        .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        tracing::debug!(agent = AGENT_NAME, prompt_version = PROMPT_VERSION, section = %section.id, "reflecting");

        let draft = validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                }
                async move {
                    let completion = llm.complete(ModelRole::Mid, &turn_prompt, &CompletionParams::default()).await?;
                    serde_json::from_str::<ReflectionDraft>(&completion.text).map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            |draft| validate_reflection(draft, revision_allowed),
        )
        .await?;

        let mut next_order = section.order + 1;
        let new_sections = draft
            .new_subsections
            .into_iter()
            .map(|sub| {
                let order = next_order;
                next_order += 1;
                Section {
                    id: SectionId::new(),
                    parent_id: Some(section.id),
                    title: sub.title,
                    brief: sub.brief,
                    order,
                    research_strategy: sub.research_strategy,
                    depends_on: Vec::new(),
                    assigned: false,
                }
            })
            .collect();

        Ok(ReflectionOutcome { sufficient: draft.sufficient, gaps: draft.gaps, refinement_queries: draft.refinement_queries, new_sections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_section_must_name_a_gap() {
        let draft = ReflectionDraft { sufficient: false, gaps: vec![], refinement_queries: vec![], new_subsections: vec![] };
        assert!(validate_reflection(&draft, true).is_err());
    }

    #[test]
    fn new_subsections_rejected_outside_revision_window() {
        let draft = ReflectionDraft {
            sufficient: true,
            gaps: vec![],
            refinement_queries: vec![],
            new_subsections: vec![NewSubsection { title: "t".into(), brief: "b".into(), research_strategy: ResearchStrategy::Synthesize }],
        };
        assert!(validate_reflection(&draft, false).is_err());
        assert!(validate_reflection(&draft, true).is_ok());
    }
}

//! The Planner: turns a mission request (and, on later rounds, Reflector
//! feedback) into an outline tree (`spec.md` §4.4.1).

use askama::Template;
use async_trait::async_trait;
use maestro_context::{GoalEntry, ResearchStrategy, Section};
use maestro_core::{CompletionParams, LLMClient, ModelRole, SectionId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::validate::validate_with_repair;

/// Prompt template version, logged on every Planner invocation so a prompt
/// change is visible in the mission's log stream.
pub const PROMPT_VERSION: u32 = 1;

const AGENT_NAME: &str = "planner";

#[derive(Template)]
#[template(path = "planner.txt", escape = "none")]
struct PlannerPrompt<'a> {
    request: &'a str,
    prior_outline: String,
    feedback: Option<&'a str>,
    goal_pad: String,
    max_depth: u32,
    max_questions: u32,
}

/// A section as proposed by the model, before ids are assigned.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SectionDraft {
    /// This section's position in the flattened draft list; referenced by
    /// later sections' `parent` and `depends_on` fields.
    pub index: usize,
    /// Index of this section's parent, or `None` at the root.
    pub parent: Option<usize>,
    /// Section heading.
    pub title: String,
    /// One-line brief describing what this section should cover.
    pub brief: String,
    /// How this section's content should be produced.
    pub research_strategy: ResearchStrategy,
    /// Indices of sections that must be written before this one. Must only
    /// reference sections with a smaller index (forward references only),
    /// which makes the dependency graph acyclic by construction.
    pub depends_on: Vec<usize>,
}

/// The Planner's raw output: a flattened outline tree.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OutlineDraft {
    /// Every section, in a valid topological order (parents and
    /// dependencies before dependents).
    pub sections: Vec<SectionDraft>,
}

/// Validates `draft` against the outline invariants the mission engine
/// relies on: unique indices, only-backward references, and bounded depth.
pub(crate) fn validate_outline_draft(draft: &OutlineDraft, max_depth: u32) -> std::result::Result<(), String> {
    if draft.sections.is_empty() {
        return Err("outline must contain at least one section".to_string());
    }
    for (position, section) in draft.sections.iter().enumerate() {
        if section.index != position {
            return Err(format!("section at position {position} has out-of-order index {}", section.index));
        }
        if let Some(parent) = section.parent {
            if parent >= position {
                return Err(format!("section {position} references parent {parent}, which is not defined yet"));
            }
        }
        for dep in &section.depends_on {
            if *dep >= position {
                return Err(format!("section {position} depends_on {dep}, which is not defined yet or is itself"));
            }
        }
    }

    let mut depth_of = vec![0u32; draft.sections.len()];
    for (position, section) in draft.sections.iter().enumerate() {
        depth_of[position] = section.parent.map_or(0, |parent| depth_of[parent] + 1);
    }
    if let Some(deepest) = depth_of.iter().max() {
        if *deepest >= max_depth {
            return Err(format!("outline nests {} levels deep, exceeding the allowed {max_depth}", deepest + 1));
        }
    }
    Ok(())
}

/// Converts a validated draft into the outline's real [`Section`] values,
/// assigning fresh [`SectionId`]s and resolving index-based references.
pub(crate) fn materialize(draft: OutlineDraft) -> Vec<Section> {
    let ids: Vec<SectionId> = draft.sections.iter().map(|_| SectionId::new()).collect();
    let mut by_parent_order: std::collections::HashMap<Option<usize>, u32> = std::collections::HashMap::new();

    draft
        .sections
        .into_iter()
        .enumerate()
        .map(|(position, section)| {
            let order_slot = by_parent_order.entry(section.parent).or_insert(0);
            let order = *order_slot;
            *order_slot += 1;
            Section {
                id: ids[position],
                parent_id: section.parent.map(|p| ids[p]),
                title: section.title,
                brief: section.brief,
                order,
                research_strategy: section.research_strategy,
                depends_on: section.depends_on.into_iter().map(|d| ids[d]).collect(),
                assigned: false,
            }
        })
        .collect()
}

fn render_outline(outline: &[Section]) -> String {
    if outline.is_empty() {
        return String::new();
    }
    outline.iter().map(|s| format!("- [{}] {} ({:?}, depends_on={})", s.order, s.title, s.research_strategy, s.depends_on.len())).collect::<Vec<_>>().join("\n")
}

fn render_goal_pad(goals: &[GoalEntry]) -> String {
    if goals.is_empty() {
        return "(none yet)".to_string();
    }
    goals.iter().map(|g| format!("- [{:?}] {}", g.status, g.text)).collect::<Vec<_>>().join("\n")
}

/// Builds and revises a mission's outline.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Proposes an outline for `request`, or revises `prior_outline` in light
    /// of `feedback` from a Reflector round.
    async fn plan(
        &self,
        llm: &dyn LLMClient,
        request: &str,
        prior_outline: &[Section],
        goal_pad: &[GoalEntry],
        feedback: Option<&str>,
        max_depth: u32,
        max_questions: u32,
    ) -> Result<Vec<Section>>;
}

/// The engine's standard Planner: one prompt, repaired up to twice on an
/// invalid draft.
#[derive(Debug, Default)]
pub struct DefaultPlanner;

#[async_trait]
impl Planner for DefaultPlanner {
    async fn plan(
        &self,
        llm: &dyn LLMClient,
        request: &str,
        prior_outline: &[Section],
        goal_pad: &[GoalEntry],
        feedback: Option<&str>,
        max_depth: u32,
        max_questions: u32,
    ) -> Result<Vec<Section>> {
        let prompt = PlannerPrompt {
            request,
            prior_outline: render_outline(prior_outline),
            feedback,
            goal_pad: render_goal_pad(goal_pad),
            max_depth,
            max_questions,
        }
        .render()
        .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        tracing::debug!(agent = AGENT_NAME, prompt_version = PROMPT_VERSION, "invoking planner");

        let draft = validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                    turn_prompt.push_str("\nFix it and answer again.");
                }
                async move {
                    let completion = llm.complete(ModelRole::Intelligent, &turn_prompt, &CompletionParams::default()).await?;
                    serde_json::from_str::<OutlineDraft>(&completion.text)
                        .map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            |draft| validate_outline_draft(draft, max_depth),
        )
        .await?;

        Ok(materialize(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(sections: Vec<SectionDraft>) -> OutlineDraft {
        OutlineDraft { sections }
    }

    fn leaf(index: usize, parent: Option<usize>, depends_on: Vec<usize>) -> SectionDraft {
        SectionDraft { index, parent, title: format!("section {index}"), brief: "brief".into(), research_strategy: ResearchStrategy::Synthesize, depends_on }
    }

    #[test]
    fn accepts_a_well_formed_flat_outline() {
        let d = draft(vec![leaf(0, None, vec![]), leaf(1, None, vec![0])]);
        assert!(validate_outline_draft(&d, 3).is_ok());
    }

    #[test]
    fn rejects_forward_reference_as_dependency() {
        let d = draft(vec![leaf(0, None, vec![1]), leaf(1, None, vec![])]);
        assert!(validate_outline_draft(&d, 3).is_err());
    }

    #[test]
    fn rejects_outline_deeper_than_allowed() {
        let d = draft(vec![leaf(0, None, vec![]), leaf(1, Some(0), vec![]), leaf(2, Some(1), vec![])]);
        assert!(validate_outline_draft(&d, 2).is_err());
    }

    #[test]
    fn materialize_assigns_sibling_order_and_resolves_dependencies() {
        let d = draft(vec![leaf(0, None, vec![]), leaf(1, None, vec![0])]);
        let sections = materialize(d);
        assert_eq!(sections[0].order, 0);
        assert_eq!(sections[1].order, 1);
        assert_eq!(sections[1].depends_on, vec![sections[0].id]);
    }
}

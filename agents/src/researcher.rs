//! The Researcher: drives search cycles for one leaf section and turns
//! retrieved evidence into cited [`Note`]s (`spec.md` §4.4.2).

use askama::Template;
use async_trait::async_trait;
use maestro_context::{GoalEntry, Note, Section, ThoughtEntry};
use maestro_core::{CompletionParams, Evidence, LLMClient, ModelRole, NoteId};
use maestro_retriever::{RetrievalRequest, RetrieverExecutor};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::validate::validate_with_repair;

/// Prompt template version for the query-proposal step.
pub const QUERY_PROMPT_VERSION: u32 = 1;
/// Prompt template version for the note-synthesis step.
pub const SYNTHESIS_PROMPT_VERSION: u32 = 1;

const AGENT_NAME: &str = "researcher";

#[derive(Template)]
#[template(path = "researcher.txt", escape = "none")]
struct ResearcherPrompt<'a> {
    section_title: &'a str,
    section_brief: &'a str,
    goal_pad: String,
    recent_thoughts: String,
    existing_note_count: usize,
    existing_notes: String,
    cycle: u32,
    max_cycles: u32,
    max_queries: u32,
}

/// The query-proposal step's raw output.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct QueryBatch {
    /// Search queries to issue this cycle, most valuable first.
    pub queries: Vec<String>,
}

fn validate_query_batch(batch: &QueryBatch, max_queries: u32) -> std::result::Result<(), String> {
    if batch.queries.is_empty() {
        return Err("must propose at least one query".to_string());
    }
    if batch.queries.len() as u32 > max_queries {
        return Err(format!("proposed {} queries, exceeding the allowed {max_queries}", batch.queries.len()));
    }
    if batch.queries.iter().any(|q| q.trim().is_empty()) {
        return Err("queries must not be blank".to_string());
    }
    Ok(())
}

/// A single note as drafted by the model, citing evidence by `source_id`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct NoteDraft {
    /// The claim text.
    pub text: String,
    /// `source_id`s of the evidence this claim is grounded in.
    pub citations: Vec<String>,
}

/// The note-synthesis step's raw output.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SynthesisDraft {
    /// Notes extracted from this cycle's evidence.
    pub notes: Vec<NoteDraft>,
    /// Whether the model believes this section now has enough evidence.
    pub sufficient: bool,
}

fn validate_synthesis(draft: &SynthesisDraft, evidence: &[Evidence], max_notes: u32) -> std::result::Result<(), String> {
    if draft.notes.len() as u32 > max_notes {
        return Err(format!("drafted {} notes, exceeding the allowed {max_notes}", draft.notes.len()));
    }
    for note in &draft.notes {
        if note.text.trim().is_empty() {
            return Err("a note's text must not be blank".to_string());
        }
        for citation in &note.citations {
            if !evidence.iter().any(|e| &e.source_id == citation) {
                return Err(format!("citation {citation} does not match any evidence offered this cycle"));
            }
        }
    }
    Ok(())
}

fn render_thoughts(thoughts: &[ThoughtEntry]) -> String {
    if thoughts.is_empty() {
        return "(none yet)".to_string();
    }
    thoughts.iter().map(|t| format!("- {}", t.text)).collect::<Vec<_>>().join("\n")
}

fn render_goal_pad(goals: &[GoalEntry]) -> String {
    if goals.is_empty() {
        return "(none yet)".to_string();
    }
    goals.iter().map(|g| format!("- [{:?}] {}", g.status, g.text)).collect::<Vec<_>>().join("\n")
}

fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "(none yet)".to_string();
    }
    notes.iter().map(|n| format!("- {}", n.text)).collect::<Vec<_>>().join("\n")
}

fn render_evidence(evidence: &[Evidence]) -> String {
    evidence.iter().map(|e| format!("[{}] {}", e.source_id, e.text)).collect::<Vec<_>>().join("\n")
}

/// The outcome of a single research cycle.
#[derive(Debug, Clone)]
pub struct ResearchCycleOutcome {
    /// Notes extracted this cycle, with fresh [`NoteId`]s and `section_id`
    /// already set.
    pub notes: Vec<Note>,
    /// Whether this section should stop being researched further.
    pub saturated: bool,
}

/// Runs search-then-synthesize cycles for one leaf section.
#[async_trait]
pub trait Researcher: Send + Sync {
    /// Runs one research cycle: propose queries, retrieve evidence,
    /// synthesize notes, and decide whether the section is saturated.
    #[allow(clippy::too_many_arguments)]
    async fn research_cycle(
        &self,
        llm: &dyn LLMClient,
        retriever: &RetrieverExecutor,
        section: &Section,
        goal_pad: &[GoalEntry],
        recent_thoughts: &[ThoughtEntry],
        existing_notes: &[Note],
        cycle: u32,
        max_cycles: u32,
        max_queries: u32,
        top_k_per_query: usize,
        min_notes: u32,
        max_notes_per_cycle: u32,
    ) -> Result<ResearchCycleOutcome>;
}

/// The engine's standard Researcher.
#[derive(Debug, Default)]
pub struct DefaultResearcher;

#[async_trait]
impl Researcher for DefaultResearcher {
    async fn research_cycle(
        &self,
        llm: &dyn LLMClient,
        retriever: &RetrieverExecutor,
        section: &Section,
        goal_pad: &[GoalEntry],
        recent_thoughts: &[ThoughtEntry],
        existing_notes: &[Note],
        cycle: u32,
        max_cycles: u32,
        max_queries: u32,
        top_k_per_query: usize,
        min_notes: u32,
        max_notes_per_cycle: u32,
    ) -> Result<ResearchCycleOutcome> {
        let prompt = ResearcherPrompt {
            section_title: &section.title,
            section_brief: &section.brief,
            goal_pad: render_goal_pad(goal_pad),
            recent_thoughts: render_thoughts(recent_thoughts),
            existing_note_count: existing_notes.len(),
            existing_notes: render_notes(existing_notes),
            cycle,
            max_cycles,
            max_queries,
        }
        .render()
        .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        tracing::debug!(agent = AGENT_NAME, prompt_version = QUERY_PROMPT_VERSION, section = %section.id, cycle, "proposing queries");

        let batch = validate_with_repair(
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
                    serde_json::from_str::<QueryBatch>(&completion.text).map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            |batch| validate_query_batch(batch, max_queries),
        )
        .await?;

        let mut evidence = Vec::new();
        for query in &batch.queries {
            let request = RetrievalRequest::new(query.clone(), top_k_per_query);
            match retriever.execute(&request).await {
                Ok(hits) => evidence.extend(hits),
                Err(source) => {
                    tracing::warn!(agent = AGENT_NAME, query, error = %source, "query returned no evidence");
                }
            }
        }

        if evidence.is_empty() {
            return Ok(ResearchCycleOutcome { notes: Vec::new(), saturated: cycle + 1 >= max_cycles });
        }

        let evidence_block = render_evidence(&evidence);
        let synthesis_prompt =
            format!("Evidence gathered this cycle:\n{evidence_block}\n\nExtract atomic, cited claims for the section \"{}\". Cite each claim using the bracketed source ids above.", section.title);

        tracing::debug!(agent = AGENT_NAME, prompt_version = SYNTHESIS_PROMPT_VERSION, section = %section.id, cycle, "synthesizing notes");

        let synthesis = validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = synthesis_prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                }
                async move {
                    let completion = llm.complete(ModelRole::Mid, &turn_prompt, &CompletionParams::default()).await?;
                    serde_json::from_str::<SynthesisDraft>(&completion.text).map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            |draft| validate_synthesis(draft, &evidence, max_notes_per_cycle),
        )
        .await?;

        let notes: Vec<Note> = synthesis.notes.into_iter().map(|d| Note { id: NoteId::new(), section_id: Some(section.id), text: d.text, citations: d.citations }).collect();

        let total_notes = (existing_notes.len() + notes.len()) as u32;
        let saturated = (synthesis.sufficient && total_notes >= min_notes) || cycle + 1 >= max_cycles;

        Ok(ResearchCycleOutcome { notes, saturated })
    }
}

#[cfg(test)]
mod tests {
    use maestro_core::{Provenance, ProvenanceKind};

    use super::*;

    fn evidence(id: &str) -> Evidence {
        Evidence { source_id: id.to_string(), text: "text".into(), score: 1.0, provenance: Provenance { kind: ProvenanceKind::Web, doc_id: None, chunk_id: None, url: None, title: None } }
    }

    #[test]
    fn rejects_empty_query_batch() {
        let batch = QueryBatch { queries: vec![] };
        assert!(validate_query_batch(&batch, 3).is_err());
    }

    #[test]
    fn rejects_too_many_queries() {
        let batch = QueryBatch { queries: vec!["a".into(), "b".into(), "c".into(), "d".into()] };
        assert!(validate_query_batch(&batch, 3).is_err());
    }

    #[test]
    fn rejects_citation_not_present_in_evidence() {
        let evidence = vec![evidence("e1")];
        let draft = SynthesisDraft { notes: vec![NoteDraft { text: "claim".into(), citations: vec!["e2".into()] }], sufficient: true };
        assert!(validate_synthesis(&draft, &evidence, 8).is_err());
    }

    #[test]
    fn accepts_well_formed_synthesis() {
        let evidence = vec![evidence("e1")];
        let draft = SynthesisDraft { notes: vec![NoteDraft { text: "claim".into(), citations: vec!["e1".into()] }], sufficient: true };
        assert!(validate_synthesis(&draft, &evidence, 8).is_ok());
    }
}

//! The Writer: renders a section's markdown from its assigned notes,
//! citing each claim by a short note key (`spec.md` §4.4.4).

use askama::Template;
use async_trait::async_trait;
use maestro_context::{Note, Section};
use maestro_core::{CompletionParams, LLMClient, ModelRole, NoteId};

use crate::error::{AgentError, Result};
use crate::validate::validate_with_repair;

/// Prompt template version, logged on every Writer invocation.
pub const PROMPT_VERSION: u32 = 1;

const AGENT_NAME: &str = "writer";

/// The inline citation key a Writer should use for `note_id`, e.g.
/// `[n_01h2x3mkja]`.
#[must_use]
pub fn citation_key(note_id: NoteId) -> String {
    let printed = note_id.to_string();
    format!("n_{}", &printed[..printed.len().min(10)])
}

#[derive(Template)]
#[template(path = "writer.txt", escape = "none")]
struct WriterPrompt<'a> {
    section_title: &'a str,
    section_brief: &'a str,
    notes: String,
    previous_content: String,
}

fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "(no notes assigned; rely on [unverified] for any claim)".to_string();
    }
    notes.iter().map(|n| format!("- [{}] {}", citation_key(n.id), n.text)).collect::<Vec<_>>().join("\n")
}

/// Checks that every `[n_...]` citation key the draft uses is one the
/// Writer was actually given notes for. Doesn't require every note be
/// cited — a Writer may judge some irrelevant to the final prose.
fn validate_markdown(markdown: &str, valid_keys: &[String]) -> std::result::Result<(), String> {
    let mut rest = markdown;
    while let Some(start) = rest.find("[n_") {
        let after = &rest[start + 1..];
        let Some(end) = after.find(']') else {
            return Err("unterminated citation bracket".to_string());
        };
        let key = &after[..end];
        if !valid_keys.iter().any(|k| k == key) {
            return Err(format!("citation key {key} does not match any note assigned to this section"));
        }
        rest = &after[end + 1..];
    }
    Ok(())
}

fn truncate_preview(text: &str, max_chars: u32) -> String {
    let max_chars = max_chars as usize;
    if text.len() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", &text[..max_chars])
    }
}

/// Renders a section's markdown body.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Writes `section`'s markdown body from `notes`, optionally revising
    /// `previous_content` from an earlier writing pass.
    async fn write_section(&self, llm: &dyn LLMClient, section: &Section, notes: &[Note], previous_content: Option<&str>, previous_preview_chars: u32) -> Result<String>;
}

/// The engine's standard Writer.
#[derive(Debug, Default)]
pub struct DefaultWriter;

#[async_trait]
impl Writer for DefaultWriter {
    async fn write_section(&self, llm: &dyn LLMClient, section: &Section, notes: &[Note], previous_content: Option<&str>, previous_preview_chars: u32) -> Result<String> {
        let preview = previous_content.map_or_else(String::new, |c| truncate_preview(c, previous_preview_chars));
        let prompt = WriterPrompt { section_title: &section.title, section_brief: &section.brief, notes: render_notes(notes), previous_content: preview }
            .render()
            .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        let valid_keys: Vec<String> = notes.iter().map(|n| citation_key(n.id)).collect();

        tracing::debug!(agent = AGENT_NAME, prompt_version = PROMPT_VERSION, section = %section.id, "writing section");

        validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                }
                async move { llm.complete(ModelRole::Intelligent, &turn_prompt, &CompletionParams::default()).await.map(|c| c.text) }
            },
            |markdown| validate_markdown(markdown, &valid_keys),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_markdown_citing_only_assigned_notes() {
        let keys = vec!["n_abc".to_string()];
        assert!(validate_markdown("Some claim [n_abc].", &keys).is_ok());
    }

    #[test]
    fn rejects_citation_to_unknown_note() {
        let keys = vec!["n_abc".to_string()];
        assert!(validate_markdown("Some claim [n_xyz].", &keys).is_err());
    }

    #[test]
    fn unverified_marker_is_not_treated_as_a_citation() {
        let keys: Vec<String> = vec![];
        assert!(validate_markdown("A claim with no source [unverified].", &keys).is_ok());
    }

    #[test]
    fn citation_key_is_stable_and_prefixed() {
        let id = NoteId::new();
        let key = citation_key(id);
        assert!(key.starts_with("n_"));
        assert_eq!(citation_key(id), key);
    }
}

//! The Messenger: the only agent that talks directly to the user, before
//! and during a mission (`spec.md` §4.4.5).

use askama::Template;
use async_trait::async_trait;
use maestro_context::MissionStatus;
use maestro_core::{CompletionParams, LLMClient, ModelRole};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::validate::validate_with_repair;

/// Prompt template version, logged on every Messenger invocation.
pub const PROMPT_VERSION: u32 = 1;

const AGENT_NAME: &str = "messenger";

#[derive(Template)]
#[template(path = "messenger.txt", escape = "none")]
struct MessengerPrompt<'a> {
    mission_exists: bool,
    mission_status: String,
    conversation: String,
    latest_message: &'a str,
}

/// A normalized pre-mission request: the user's message turned into a clean
/// research brief, plus any settings they implied changing.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct NormalizedRequest {
    /// The mission request the Planner should receive.
    pub normalized_request: String,
    /// Partial settings overrides the user implied (e.g. "keep it short").
    /// Merged over the defaults before the mission record is created.
    pub settings_overrides: serde_json::Value,
}

fn validate_normalized_request(draft: &NormalizedRequest) -> std::result::Result<(), String> {
    if draft.normalized_request.trim().is_empty() {
        return Err("normalized_request must not be blank".to_string());
    }
    if !draft.settings_overrides.is_null() && !draft.settings_overrides.is_object() {
        return Err("settings_overrides must be a JSON object or null".to_string());
    }
    Ok(())
}

/// An in-flight chat reply: recorded as a thought, never a direct mutation
/// of the outline, notes, or report.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct InFlightReply {
    /// The reply shown to the user.
    pub reply: String,
    /// The reply recorded into the mission's thought pad, for later agents
    /// to see as context.
    pub recorded_thought: String,
}

fn validate_in_flight_reply(draft: &InFlightReply) -> std::result::Result<(), String> {
    if draft.reply.trim().is_empty() {
        return Err("reply must not be blank".to_string());
    }
    Ok(())
}

/// Normalizes user requests and answers in-flight chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Turns a user's first message into a normalized mission request.
    async fn normalize_request(&self, llm: &dyn LLMClient, raw_message: &str) -> Result<NormalizedRequest>;

    /// Answers a chat message sent while a mission is already running,
    /// without mutating any committed mission artefact.
    async fn handle_in_flight(&self, llm: &dyn LLMClient, mission_status: MissionStatus, conversation: &[String], latest_message: &str) -> Result<InFlightReply>;
}

/// The engine's standard Messenger.
#[derive(Debug, Default)]
pub struct DefaultMessenger;

#[async_trait]
impl Messenger for DefaultMessenger {
    async fn normalize_request(&self, llm: &dyn LLMClient, raw_message: &str) -> Result<NormalizedRequest> {
        let prompt = MessengerPrompt { mission_exists: false, mission_status: String::new(), conversation: String::new(), latest_message: raw_message }
            .render()
            .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        tracing::debug!(agent = AGENT_NAME, prompt_version = PROMPT_VERSION, "normalizing pre-mission request");

        validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                }
                async move {
                    let completion = llm.complete(ModelRole::Fast, &turn_prompt, &CompletionParams::default()).await?;
                    serde_json::from_str::<NormalizedRequest>(&completion.text).map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            validate_normalized_request,
        )
        .await
    }

    async fn handle_in_flight(&self, llm: &dyn LLMClient, mission_status: MissionStatus, conversation: &[String], latest_message: &str) -> Result<InFlightReply> {
        let conversation_block = if conversation.is_empty() { "(no prior messages)".to_string() } else { conversation.join("\n") };
        let prompt = MessengerPrompt {
            mission_exists: true,
            mission_status: format!("{mission_status:?}"),
            conversation: conversation_block,
            latest_message,
        }
        .render()
        .map_err(|err| AgentError::Validation { agent: AGENT_NAME, attempts: 0, detail: format!("template render failed: {err}") })?;

        tracing::debug!(agent = AGENT_NAME, prompt_version = PROMPT_VERSION, "handling in-flight chat");

        validate_with_repair(
            AGENT_NAME,
            2,
            |complaint: Option<&str>| {
                let mut turn_prompt = prompt.clone();
                if let Some(complaint) = complaint {
                    turn_prompt.push_str("\n\nYour previous answer was rejected: ");
                    turn_prompt.push_str(complaint);
                }
                async move {
                    let completion = llm.complete(ModelRole::Fast, &turn_prompt, &CompletionParams::default()).await?;
                    serde_json::from_str::<InFlightReply>(&completion.text).map_err(|err| maestro_core::CapabilityError::MalformedResponse(err.to_string()))
                }
            },
            validate_in_flight_reply,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_normalized_request() {
        let draft = NormalizedRequest { normalized_request: "   ".into(), settings_overrides: serde_json::Value::Null };
        assert!(validate_normalized_request(&draft).is_err());
    }

    #[test]
    fn rejects_non_object_settings_overrides() {
        let draft = NormalizedRequest { normalized_request: "research X".into(), settings_overrides: serde_json::json!("not an object") };
        assert!(validate_normalized_request(&draft).is_err());
    }

    #[test]
    fn accepts_null_or_object_overrides() {
        let a = NormalizedRequest { normalized_request: "research X".into(), settings_overrides: serde_json::Value::Null };
        let b = NormalizedRequest { normalized_request: "research X".into(), settings_overrides: serde_json::json!({"writing_passes": 2}) };
        assert!(validate_normalized_request(&a).is_ok());
        assert!(validate_normalized_request(&b).is_ok());
    }
}

//! The [`LLMClient`] capability adapter.
//!
//! MAESTRO never talks to a model provider directly — per the spec's scope,
//! "LLM inference" is an external capability. This module only describes the
//! shape every provider adapter must expose: `complete(role, prompt, params)
//! -> {text, usage, cost}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which model tier an agent is asking for.
///
/// Mission settings bind each role to a concrete `{provider, model}` pair (see
/// `spec.md` §6, "Models"); the engine itself only ever reasons about roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Cheap, low-latency model for triage and repair prompts.
    Fast,
    /// Default reasoning tier used by most agent steps.
    Mid,
    /// Highest-capability tier, reserved for planning and final writing passes.
    Intelligent,
    /// Used exclusively to validate/repair malformed artefacts from other roles.
    Verifier,
}

/// Free-form generation parameters passed to a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Sampling temperature, if the provider supports it.
    pub temperature: Option<f32>,
    /// Hard cap on generated tokens.
    pub max_tokens: Option<u32>,
    /// Stop sequences that end generation early.
    pub stop: Vec<String>,
}

/// Token accounting for a single `complete` call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens consumed by the completion.
    pub completion_tokens: u64,
    /// Provider-native token count, when it differs from the above (e.g. a
    /// tokenizer mismatch between the engine's estimate and the provider's).
    pub native_tokens: u64,
}

impl TokenUsage {
    /// Combines two usage records, as when accumulating mission-level stats.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self
                .completion_tokens
                .saturating_add(other.completion_tokens),
            native_tokens: self.native_tokens.saturating_add(other.native_tokens),
        }
    }
}

/// The result of a single [`LLMClient::complete`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Token accounting for this call.
    pub usage: TokenUsage,
    /// Dollar cost of this call, as billed by the provider.
    pub cost_usd: f64,
}

/// Capability adapter for text generation.
///
/// Implementations are thin façades over a concrete provider; MAESTRO never
/// assumes a specific vendor. `Send + Sync` so a single client can be shared
/// (`Arc<dyn LLMClient>`) across concurrently running mission sections.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generates a completion for `prompt` under the given `role`.
    async fn complete(
        &self,
        role: ModelRole,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<Completion>;
}

#[async_trait]
impl<T: LLMClient + ?Sized> LLMClient for std::sync::Arc<T> {
    async fn complete(
        &self,
        role: ModelRole,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<Completion> {
        (**self).complete(role, prompt, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_accumulates_without_overflow() {
        let a = TokenUsage {
            prompt_tokens: u64::MAX - 1,
            completion_tokens: 10,
            native_tokens: 10,
        };
        let b = TokenUsage {
            prompt_tokens: 5,
            completion_tokens: 5,
            native_tokens: 5,
        };
        let sum = a.saturating_add(b);
        assert_eq!(sum.prompt_tokens, u64::MAX);
        assert_eq!(sum.completion_tokens, 15);
    }
}

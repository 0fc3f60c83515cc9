//! [`CostTrackingLlmClient`]: an [`LLMClient`] decorator that folds every
//! call's usage into a mission's running stats.

use std::sync::Arc;

use async_trait::async_trait;
use maestro_bus::{EventBus, Topic};
use maestro_context::{MissionStats, MissionContextStore};
use maestro_core::{CompletionParams, Completion, LLMClient, MissionId, ModelRole, Result};

/// Wraps an [`LLMClient`] so every `complete` call increments
/// `mission.stats` and republishes the mission's stats on [`Topic::Status`].
///
/// A failed call logs the attempt but records no usage: providers don't
/// generally bill for a call that never produced a completion, and
/// `CapabilityError` carries no usage data to fold in.
pub struct CostTrackingLlmClient<L> {
    inner: L,
    context: Arc<MissionContextStore>,
    bus: Arc<EventBus>,
    mission_id: MissionId,
}

impl<L: LLMClient> CostTrackingLlmClient<L> {
    /// Wraps `inner`, metering every call against `mission_id`.
    #[must_use]
    pub fn new(inner: L, context: Arc<MissionContextStore>, bus: Arc<EventBus>, mission_id: MissionId) -> Self {
        Self { inner, context, bus, mission_id }
    }
}

#[async_trait]
impl<L: LLMClient> LLMClient for CostTrackingLlmClient<L> {
    async fn complete(&self, role: ModelRole, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        let result = self.inner.complete(role, prompt, params).await;
        match &result {
            Ok(completion) => {
                let delta = MissionStats {
                    prompt_tokens: completion.usage.prompt_tokens,
                    completion_tokens: completion.usage.completion_tokens,
                    native_tokens: completion.usage.native_tokens,
                    cost_usd: completion.cost_usd,
                    web_searches: 0,
                };
                self.context.record_stats(self.mission_id, delta).await;
                tracing::debug!(
                    mission_id = %self.mission_id,
                    ?role,
                    prompt_tokens = delta.prompt_tokens,
                    completion_tokens = delta.completion_tokens,
                    cost_usd = delta.cost_usd,
                    "llm call metered"
                );
                if let Ok(snapshot) = self.context.snapshot(self.mission_id).await {
                    self.bus.publish(self.mission_id, Topic::Status, &snapshot.stats);
                }
            }
            Err(err) => {
                tracing::warn!(mission_id = %self.mission_id, ?role, %err, "llm call failed, no usage to record");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use maestro_core::TokenUsage;

    use super::*;

    struct FixedClient {
        completion: Completion,
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn complete(&self, _role: ModelRole, _prompt: &str, _params: &CompletionParams) -> Result<Completion> {
            Ok(self.completion.clone())
        }
    }

    #[tokio::test]
    async fn successful_call_increments_mission_stats() {
        let context = Arc::new(MissionContextStore::new());
        let bus = Arc::new(EventBus::new(16));
        let mission_id = MissionId::new();
        context.create_mission(mission_id, "query").await;

        let inner = FixedClient {
            completion: Completion {
                text: "answer".into(),
                usage: TokenUsage { prompt_tokens: 100, completion_tokens: 40, native_tokens: 0 },
                cost_usd: 0.02,
            },
        };
        let tracked = CostTrackingLlmClient::new(inner, Arc::clone(&context), Arc::clone(&bus), mission_id);

        tracked.complete(ModelRole::Mid, "hi", &CompletionParams::default()).await.unwrap();
        tracked.complete(ModelRole::Mid, "hi again", &CompletionParams::default()).await.unwrap();

        let snapshot = context.snapshot(mission_id).await.unwrap();
        assert_eq!(snapshot.stats.prompt_tokens, 200);
        assert_eq!(snapshot.stats.completion_tokens, 80);
        assert!((snapshot.stats.cost_usd - 0.04).abs() < 1e-9);
    }

    #[tokio::test]
    async fn successful_call_publishes_stats_on_status_topic() {
        let context = Arc::new(MissionContextStore::new());
        let bus = Arc::new(EventBus::new(16));
        let mission_id = MissionId::new();
        context.create_mission(mission_id, "query").await;

        let inner = FixedClient {
            completion: Completion {
                text: "answer".into(),
                usage: TokenUsage { prompt_tokens: 5, completion_tokens: 5, native_tokens: 0 },
                cost_usd: 0.001,
            },
        };
        let tracked = CostTrackingLlmClient::new(inner, Arc::clone(&context), Arc::clone(&bus), mission_id);

        let mut sub = bus.subscribe(mission_id, Topic::Status);
        tracked.complete(ModelRole::Fast, "hi", &CompletionParams::default()).await.unwrap();

        let message = sub.recv().await.unwrap();
        assert_eq!(message.payload["prompt_tokens"], 5);
    }
}

//! # maestro-telemetry
//!
//! Cost-tracking decorators for capability adapters. Every LLM completion and
//! web search a mission makes passes through one of these wrappers on its way
//! to the real provider, so `mission.stats` stays accurate without every
//! agent having to remember to record its own usage.
//!
//! Both decorators implement the same trait they wrap (`LLMClient`,
//! `WebSearchClient`), so an agent holds one and never knows it's metered.

pub mod llm;
pub mod websearch;

pub use llm::CostTrackingLlmClient;
pub use websearch::CostTrackingWebSearchClient;

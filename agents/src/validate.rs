//! Generic malformed-artefact repair loop shared by every agent.
//!
//! Grounded on the teacher's tool-call retry branch: a bad artefact isn't a
//! hard failure, it's fed back to the model as a complaint and regenerated a
//! bounded number of times before the step is given up on.

use std::future::Future;

use crate::error::{AgentError, Result};

/// Runs `generate` up to `1 + max_repairs` times, validating each artefact
/// with `validate`. The first failure's complaint (and every one after) is
/// passed back into `generate` as repair feedback.
///
/// Returns [`AgentError::Validation`] if every attempt fails, carrying the
/// final complaint and the number of attempts made.
pub async fn validate_with_repair<T, Gen, Fut>(
    agent_name: &'static str,
    max_repairs: u32,
    mut generate: Gen,
    validate: impl Fn(&T) -> std::result::Result<(), String>,
) -> Result<T>
where
    Gen: FnMut(Option<&str>) -> Fut,
    Fut: Future<Output = maestro_core::Result<T>>,
{
    let mut complaint: Option<String> = None;
    let mut attempts = 0;

    for attempt in 0..=max_repairs {
        attempts = attempt + 1;
        let artefact = generate(complaint.as_deref()).await.map_err(|source| AgentError::Capability { agent: agent_name, source })?;
        match validate(&artefact) {
            Ok(()) => return Ok(artefact),
            Err(detail) => {
                tracing::warn!(agent = agent_name, attempt, %detail, "artefact failed validation, retrying with repair prompt");
                complaint = Some(detail);
            }
        }
    }

    Err(AgentError::Validation { agent: agent_name, attempts, detail: complaint.unwrap_or_default() })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test]
    async fn succeeds_immediately_when_first_artefact_is_valid() {
        let result = validate_with_repair("test", 2, |_complaint| async { Ok(42) }, |n: &i32| if *n == 42 { Ok(()) } else { Err("wrong".into()) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn repairs_on_subsequent_attempt() {
        let calls = Cell::new(0);
        let result = validate_with_repair(
            "test",
            2,
            |_complaint| {
                let n = calls.get();
                calls.set(n + 1);
                async move { Ok(n) }
            },
            |n: &i32| if *n >= 1 { Ok(()) } else { Err("too small".into()) },
        )
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_repairs() {
        let result = validate_with_repair("test", 2, |_complaint| async { Ok(0) }, |_: &i32| Err::<(), String>("never valid".into())).await;
        let err = result.unwrap_err();
        match err {
            AgentError::Validation { agent, attempts, detail } => {
                assert_eq!(agent, "test");
                assert_eq!(attempts, 3);
                assert_eq!(detail, "never valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

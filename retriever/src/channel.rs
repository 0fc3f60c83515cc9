//! The [`RetrievalChannel`] trait and a jittered-backoff retry wrapper
//! shared by every channel implementation.

use async_trait::async_trait;
use maestro_core::Evidence;
use rand::Rng;

use crate::error::RetrieverError;

/// A single retrieval source (the document index, web search, ...).
#[async_trait]
pub trait RetrievalChannel: Send + Sync {
    /// Channel name, used in logging and [`RetrieverError::ChannelFailed`].
    fn name(&self) -> &'static str;

    /// Runs the query against this channel, returning up to `top_k` evidence
    /// items. Implementations classify their own failures as
    /// [`RetrieverError::Transient`] (worth retrying) or
    /// [`RetrieverError::ChannelFailed`] (not).
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>, RetrieverError>;
}

/// Retries `attempt` up to `max_attempts` times when it fails with
/// [`RetrieverError::Transient`], waiting a jittered exponential backoff
/// between tries. Any other error is returned immediately.
pub async fn retry_with_backoff<F, Fut>(channel_name: &'static str, max_attempts: u32, mut attempt: F) -> Result<Vec<Evidence>, RetrieverError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<Evidence>, RetrieverError>>,
{
    let mut last_err = None;
    for try_number in 0..max_attempts {
        match attempt().await {
            Ok(evidence) => return Ok(evidence),
            Err(RetrieverError::Transient(err)) => {
                tracing::warn!(channel = channel_name, attempt = try_number + 1, error = %err, "transient retrieval failure, retrying");
                last_err = Some(err);
                if try_number + 1 < max_attempts {
                    tokio::time::sleep(backoff_delay(try_number)).await;
                }
            }
            Err(other) => return Err(other),
        }
    }
    Err(RetrieverError::ChannelFailed {
        channel: channel_name,
        source: last_err.unwrap_or_else(|| anyhow::anyhow!("exhausted retries")),
    })
}

fn backoff_delay(try_number: u32) -> std::time::Duration {
    let base_ms = 100u64.saturating_mul(1u64 << try_number.min(5));
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms / 2 + 1);
    std::time::Duration::from_millis(base_ms + jitter_ms)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_is_ok() {
        let result = retry_with_backoff("test", 3, || async { Ok(Vec::new()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RetrieverError::Transient(anyhow::anyhow!("flaky")))
                } else {
                    Ok(Vec::new())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let result: Result<Vec<Evidence>, _> =
            retry_with_backoff("test", 2, || async { Err(RetrieverError::Transient(anyhow::anyhow!("down"))) }).await;
        assert!(matches!(result, Err(RetrieverError::ChannelFailed { channel: "test", .. })));
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RetrieverError::NoEvidence) }
        })
        .await;
        assert!(matches!(result, Err(RetrieverError::NoEvidence)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

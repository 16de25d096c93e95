//! Exponential-backoff retry for transient reader/writer failures (spec
//! §4.1 "Retry policy"): `maxRetries` attempts, starting at `retryDelayMs`,
//! doubling on each attempt, capped at 30s. Transformers are never retried
//! (they're declared deterministic given input, §4.2) — this module is
//! only ever driven around a reader fetch or a writer batch.

use std::future::Future;
use std::time::Duration;

use model::{PipelineMetrics, RetryPolicyConfig};

use crate::error::EngineError;

const MAX_BACKOFF_MS: u64 = 30_000;

/// Runs `op` under `policy`, retrying transient `EngineError`s up to
/// `policy.max_retries` times with doubling backoff. A fatal error (or a
/// transient one past the retry budget) is returned immediately.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicyConfig, metrics: &PipelineMetrics, mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                metrics.record_retry();
                let delay = backoff_delay(policy.retry_delay_ms, attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.min(20)).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let policy = RetryPolicyConfig {
            max_retries: 3,
            retry_delay_ms: 0,
        };
        let metrics = PipelineMetrics::new();
        let attempts = AtomicU32::new(0);
        let result = with_retry(&policy, &metrics, || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(EngineError::Transient("boom".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(metrics.snapshot().retries, 2);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let policy = RetryPolicyConfig {
            max_retries: 5,
            retry_delay_ms: 0,
        };
        let metrics = PipelineMetrics::new();
        let attempts = AtomicU32::new(0);
        let result: Result<(), EngineError> = with_retry(&policy, &metrics, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Fatal("nope".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retry_budget_then_fails() {
        let policy = RetryPolicyConfig {
            max_retries: 2,
            retry_delay_ms: 0,
        };
        let metrics = PipelineMetrics::new();
        let attempts = AtomicU32::new(0);
        let result: Result<(), EngineError> = with_retry(&policy, &metrics, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Transient("still down".into()))
        })
        .await;
        assert!(result.is_err());
        // initial attempt + 2 retries = 3 total calls
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}

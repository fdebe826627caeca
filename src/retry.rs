//! Bounded retries with exponential backoff for calls to managed services.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub max_interval_ms: u64,
}

impl RetryPolicy {
    /// Exponential backoff: 1s, 2s, 4s, ... with jitter.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval_ms: 1_000,
            multiplier: 2.0,
            randomization_factor: 0.5,
            max_interval_ms: 30_000,
        }
    }

    /// Same delay between every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        Self {
            max_attempts,
            initial_interval_ms: delay_ms,
            multiplier: 1.0,
            randomization_factor: 0.0,
            max_interval_ms: delay_ms,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_interval(Duration::from_millis(
                self.max_interval_ms.max(self.initial_interval_ms),
            ))
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5)
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` attempts have
/// failed, sleeping between attempts. The last error is returned.
pub async fn with_backoff<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let attempts = AtomicU32::new(0);

    retry_notify(
        policy.backoff(),
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = operation();
            async move {
                fut.await.map_err(|e| {
                    if attempt >= max_attempts {
                        tracing::error!(operation = label, attempt, error = %e, "all attempts failed");
                        backoff::Error::permanent(e)
                    } else {
                        backoff::Error::transient(e)
                    }
                })
            }
        },
        |e: E, delay: Duration| {
            tracing::warn!(
                operation = label,
                error = %e,
                retry_in_ms = delay.as_millis() as u64,
                "attempt failed, retrying"
            );
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, String> = with_backoff(&quick(5), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("failure {n}"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = with_backoff(&quick(3), "broken", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fixed_policy_has_no_jitter() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        assert_eq!(policy.initial_interval_ms, 2_000);
        assert_eq!(policy.multiplier, 1.0);
        assert_eq!(policy.randomization_factor, 0.0);
    }
}

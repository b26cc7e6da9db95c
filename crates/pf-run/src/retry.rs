// retry.rs — Exponential backoff for completion-backed steps.
//
// Only errors that report themselves retryable are repeated; auth,
// validation, and structural failures return on the first attempt. A
// rate-limit `retry_after` hint raises the delay but never past `max_delay`.

use std::future::Future;
use std::time::Duration;

use pf_completion::CompletionError;
use pf_plan::PlanError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// `[retry]` section of forge.toml.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

// Serde default functions
fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl RetryPolicy {
    /// Retries without sleeping. Used where wall-clock delays are unwanted.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    ///
    /// `base * 2^(attempt-1)` plus up to `base/2` of jitter, capped at
    /// `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        let exponential = self.base_delay().saturating_mul(1u32 << shift);
        let half_base = self.base_delay_ms / 2;
        let jitter = if half_base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=half_base)
        };
        (exponential + Duration::from_millis(jitter)).min(self.max_delay())
    }

    fn delay_for(&self, attempt: u32, error: &PlanError) -> Duration {
        let mut delay = self.backoff_delay(attempt);
        if let PlanError::Completion(CompletionError::RateLimit {
            retry_after: Some(hint),
            ..
        }) = error
        {
            delay = delay.max(*hint).min(self.max_delay());
        }
        delay
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, PlanError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlanError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = self.delay_for(attempt, &e);
                    tracing::warn!(
                        step = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn network() -> PlanError {
        PlanError::Completion(CompletionError::Network("reset".into()))
    }

    #[test]
    fn defaults_match_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(500));
        assert_eq!(policy.max_delay(), Duration::from_secs(8));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        let first = policy.backoff_delay(1);
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(750));
        let third = policy.backoff_delay(3);
        assert!(third >= Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(20), Duration::from_secs(8));
    }

    #[test]
    fn retry_after_hint_is_respected_up_to_cap() {
        let policy = RetryPolicy::default();
        let hinted = PlanError::Completion(CompletionError::RateLimit {
            message: "slow".into(),
            retry_after: Some(Duration::from_secs(60)),
        });
        assert_eq!(policy.delay_for(1, &hinted), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(network())
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(2)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(network())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PlanError::Completion(CompletionError::Auth("nope".into())))
            })
            .await;
        assert!(matches!(
            result,
            Err(PlanError::Completion(CompletionError::Auth(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

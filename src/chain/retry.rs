//! Retry policy for capability calls.
//!
//! Every call to a generation, media or content service goes through [`with_retry`]. The
//! policy is plain data so it can be read straight from configuration.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Exponential backoff policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after every failed attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> u32 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: initial_delay.as_millis() as u64,
            backoff_factor,
        }
    }

    /// Single attempt, no sleeping.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay slept after the failed attempt with 0-based index `failed_attempt`.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let factor = self.backoff_factor.saturating_pow(failed_attempt);
        self.initial_delay().saturating_mul(factor)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.backoff_factor == 0 {
            return Err("backoff_factor must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Run `op` until it succeeds, the policy is exhausted, or it fails with a non-retryable error.
///
/// The last error is returned on exhaustion. No sleep follows the final attempt.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        let started = Instant::now();
        let outcome = op().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let err = match outcome {
            Ok(value) => {
                debug!(operation, attempt = attempt + 1, elapsed_ms, "Call succeeded");
                return Ok(value);
            }
            Err(err) => err,
        };

        let remaining = attempts - attempt - 1;
        if remaining == 0 || !err.is_retryable() {
            warn!(
                operation,
                attempt = attempt + 1,
                elapsed_ms,
                error = %err,
                "Call failed, giving up"
            );
            return Err(err);
        }

        let delay = policy.delay_after(attempt);
        warn!(
            operation,
            attempt = attempt + 1,
            remaining,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Call failed, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}

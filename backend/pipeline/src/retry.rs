//! Retry combinator: bounded attempts, a retryable-error predicate, and a
//! backoff strategy.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Re-attempt immediately.
    None,
    Fixed { delay_ms: u64 },
    Exponential { base_ms: u64, factor: f64, max_ms: u64 },
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
        }
    }

    /// Compute the delay after failed attempt `attempt_number` (1-indexed).
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        if attempt_number == 0 {
            return Duration::ZERO;
        }
        match &self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            Backoff::Exponential { base_ms, factor, max_ms } => {
                let delay_ms = *base_ms as f64 * factor.powi((attempt_number - 1) as i32);
                Duration::from_millis(delay_ms.min(*max_ms as f64) as u64)
            }
        }
    }

    pub fn should_retry(&self, attempt_number: u32) -> bool {
        attempt_number < self.max_attempts
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error, returned as soon as it occurred.
    Fatal(E),
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or the policy runs out of attempts. `op` receives the 1-indexed attempt.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
            Err(e) if !policy.should_retry(attempt) => {
                warn!(attempt, error = %e, "Retry policy exhausted");
                return Err(RetryError::Exhausted { attempts: attempt, last: e });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable failure, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

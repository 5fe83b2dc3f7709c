//! Retry utilities for calls to the verification service
//!
//! The delay schedule is a [`RetryPolicy`]. [`FixedInterval`] (3 attempts,
//! 200 ms apart) is what the remote client uses by default;
//! [`ExponentialBackoff`] is available for callers that need to back off a
//! struggling service.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Schedule of attempts for a retried operation
pub trait RetryPolicy: fmt::Debug + Send + Sync {
    /// Total number of attempts, including the first one. Values below 1 are
    /// treated as 1.
    fn max_attempts(&self) -> u32;

    /// Pause after the failed attempt number `attempt` (1-based)
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same pause between every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_millis(200),
        }
    }
}

impl FixedInterval {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

impl RetryPolicy for FixedInterval {
    fn max_attempts(&self) -> u32 {
        self.attempts
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Exponentially growing pause, capped at `max_delay_ms`
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Total number of attempts
    pub attempts: u32,

    /// Pause after the first failure in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ExponentialBackoff {
    /// Create a backoff with custom delays
    pub fn with_delays(attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            attempts,
            base_delay_ms,
            max_delay_ms,
            ..Default::default()
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        self.attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let exponential = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis((exponential as u64).min(self.max_delay_ms))
    }
}

/// Successful outcome of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Every attempt failed
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

/// Execute an operation until it succeeds or the policy runs out of attempts.
///
/// The closure receives the 1-based attempt number. Every error is treated as
/// retryable.
///
/// # Example
///
/// ```no_run
/// use nameverify::utils::retry::{with_retry, FixedInterval};
///
/// # async fn run() {
/// let outcome = with_retry(&FixedInterval::default(), |_attempt| async {
///     Ok::<_, String>(42)
/// })
/// .await;
/// assert_eq!(outcome.map(|r| r.value), Ok(42));
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &P,
    mut operation: F,
) -> Result<Retried<T>, Exhausted<E>>
where
    P: RetryPolicy + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts().max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) if attempt >= max_attempts => {
                return Err(Exhausted {
                    last_error: e,
                    attempts: attempt,
                });
            }
            Err(e) => {
                let delay = policy.delay(attempt);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

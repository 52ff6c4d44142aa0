//! Bounded retry helper
//!
//! Keeps retry policy out of the fetchers: a fetcher makes one attempt, and
//! the caller decides how many attempts to make and which errors qualify.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: usize,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent
///
/// `operation` receives the 1-based attempt number and must create any
/// per-attempt resource itself, so every retry starts fresh.
///
/// # Returns
///
/// The first success, or the error from the last attempt made.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_retryable(&e) => {
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, policy.max_attempts, e, policy.delay
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

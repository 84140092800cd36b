//! Bounded exponential-backoff retries for calls against the server.
//!
//! A [`RetryPolicy`] retries transport failures and responses whose status is
//! in its retryable set. The delay before retry `n` (counting from 0) is
//! `backoff_base * 2^n`, with no jitter, so a policy with `max_retries = N`
//! makes at most `N + 1` attempts and its sleep schedule is fully predictable.
//! When the budget runs out the last error is returned unchanged.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::OpencodeError;
use crate::http::loud_wire;

/// Statuses retried by default: rate limiting and transient gateway/server failures.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Delay before the first retry unless configured otherwise.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Retry configuration for a single logical call.
///
/// # Example
///
/// ```
/// use opencode_sdk::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(3)
///     .with_backoff_base(Duration::from_millis(100));
///
/// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_base: DEFAULT_BACKOFF_BASE,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the defaults: no retries, 0.5s base, 429/500/502/503/504.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Replaces the set of statuses treated as transient.
    #[must_use]
    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Delay before retry number `attempt` (0-based). Saturates instead of overflowing.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff_base.is_zero() {
            return Duration::ZERO;
        }
        1u32.checked_shl(attempt)
            .and_then(|factor| self.backoff_base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Whether `error`, observed after `attempt` earlier retries, warrants another try.
    #[must_use]
    pub fn should_retry(&self, error: &OpencodeError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable(&self.retryable_statuses)
    }

    /// Runs a blocking operation, sleeping the current thread between attempts.
    ///
    /// # Errors
    ///
    /// Returns the operation's error once it is not retryable or the retry
    /// budget is spent.
    pub fn call<T, F>(&self, operation: F) -> Result<T, OpencodeError>
    where
        F: FnMut() -> Result<T, OpencodeError>,
    {
        self.call_with_sleep(operation, std::thread::sleep)
    }

    pub(crate) fn call_with_sleep<T, F, S>(
        &self,
        mut operation: F,
        mut sleep: S,
    ) -> Result<T, OpencodeError>
    where
        F: FnMut() -> Result<T, OpencodeError>,
        S: FnMut(Duration),
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let delay = self.next_delay(error, attempt)?;
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Runs an async operation, suspending the task between attempts.
    ///
    /// `operation` is invoked once per attempt and must build a fresh future
    /// each time.
    ///
    /// # Errors
    ///
    /// Returns the operation's error once it is not retryable or the retry
    /// budget is spent.
    pub async fn call_async<T, F, Fut>(&self, mut operation: F) -> Result<T, OpencodeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OpencodeError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let delay = self.next_delay(error, attempt)?;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Returns the delay to wait before retrying, or hands the error back.
    fn next_delay(&self, error: OpencodeError, attempt: u32) -> Result<Duration, OpencodeError> {
        if !self.should_retry(&error, attempt) {
            if attempt > 0 {
                debug!(attempts = attempt + 1, error = %error, "Retry budget exhausted");
            }
            return Err(error);
        }

        let delay = self.delay_for(attempt);
        warn!(
            attempt = attempt + 1,
            max_retries = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Request failed, retrying after backoff"
        );
        loud_wire::log_retry(attempt + 1, delay, &error);
        Ok(delay)
    }
}

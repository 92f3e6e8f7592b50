//! Retry with exponential back-off and jitter for outbound calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries it
//! while the supplied predicate classifies the failure as transient. The
//! client applies it around every request with
//! [`ApiError::is_retriable`](crate::ApiError::is_retriable).

use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 60_000;

/// Attempt count and base delay for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later one.
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Un-jittered delay before retry number `attempt` (1-based), capped at 60 s.
    #[must_use]
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        computed.min(MAX_DELAY_MS)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 500)
    }
}

/// Runs `operation`, retrying up to `policy.max_retries` times while
/// `should_retry` returns `true` for the error.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Retry | Sleep before it               |
/// |-------|-------------------------------|
/// | 1     | 500 ms × 2⁰ ± 25 % jitter     |
/// | 2     | 500 ms × 2¹ ± 25 % jitter     |
/// | 3     | 500 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s. Errors the predicate rejects are returned
/// immediately, as is the last error once retries run out.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = policy.base_delay_ms(attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient upstream error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

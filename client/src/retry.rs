//! Retry controller for device agent requests

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ApiError;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Retry policy applied to every retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Upper bound on total attempts, including the first one
    pub max_attempts: u32,

    /// Backoff between attempts
    pub cooldown: CooldownOptions,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            cooldown: CooldownOptions::default(),
        }
    }
}

impl RetryPolicy {
    /// Fixed-delay policy
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            cooldown: CooldownOptions {
                base_delay: delay,
                max_delay: delay,
                multiplier: 1.0,
            },
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calc_exp_backoff(&self.cooldown, attempt.saturating_sub(1))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// The last observed error is returned unchanged once attempts are
/// exhausted. Cancelling `cancel` aborts the in-flight attempt or the wait
/// between attempts and yields [`ApiError::Cancelled`].
pub async fn run_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", label, attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!("{} failed with non-retryable error: {}", label, err);
            return Err(err);
        }

        if attempt >= max_attempts {
            warn!("{} failed after {} attempts: {}", label, attempt, err);
            return Err(err);
        }

        let delay = policy.delay_after(attempt);
        warn!(
            "{} failed (attempt {}/{}), retrying in {:?}: {}",
            label, attempt, max_attempts, delay, err
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("{} cancelled while waiting to retry", label);
                return Err(ApiError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

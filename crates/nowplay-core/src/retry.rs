//! Bounded retry with exponential backoff for transport calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, StatusError};

/// Retry configuration for messaging operations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after every further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay that follows failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// Every failed attempt is followed by its backoff delay, so the default
    /// policy waits 2, 4, 8, 16 and 32 seconds before giving up with
    /// [`StatusError::RetriesExhausted`].  The backoff sleeps end early with
    /// [`StatusError::Cancelled`] once `cancel` fires; a call already in
    /// flight is never interrupted.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "transport call recovered");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        delay = ?delay,
                        "transport call failed"
                    );
                    last_error = e.to_string();
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::debug!(operation, attempt, "retry abandoned, session cancelled");
                            return Err(StatusError::Cancelled {
                                operation: operation.to_string(),
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(StatusError::RetriesExhausted {
            operation: operation.to_string(),
            attempts: max_attempts,
            reason: last_error,
        })
    }
}

//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed upstream attempt may be retried
//! - Execute retries with exponential backoff + jitter
//! - Bound the attempt count (`max_retries + 1` attempts in total)
//!
//! # Design Decisions
//! - Timeouts, connection errors and 5xx are retryable
//! - 4xx responses and not-found are fatal on the first attempt
//! - Each attempt gets its own deadline

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, max_backoff};
use crate::resilience::timeouts::with_timeout;
use crate::upstream::error::UpstreamError;

/// Whether an HTTP status from an upstream service is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    (500..600).contains(&status)
}

/// The final failure of a retried call.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    /// Attempts actually made.
    pub attempts: u32,
    /// Last error observed.
    pub last_error: UpstreamError,
}

/// Bounded retry policy for one upstream target.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            attempt_timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Longest time [`run`](Self::run) can take: every attempt timing out,
    /// with the largest backoff between attempts.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts();
        let backoff: Duration = (1..attempts)
            .map(|attempt| max_backoff(attempt, self.base_delay_ms, self.max_delay_ms))
            .sum();
        self.attempt_timeout.saturating_mul(attempts) + backoff
    }

    /// Run `op` until it succeeds, fails fatally, or attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number. `target` labels logs and metrics.
    pub async fn run<T, F, Fut>(&self, target: &'static str, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match with_timeout(self.attempt_timeout, op(attempt)).await {
                Ok(value) => {
                    metrics::record_upstream_attempt(target, "success");
                    return Ok(value);
                }
                Err(err) => {
                    metrics::record_upstream_attempt(target, err.outcome());

                    if err.is_transient() && attempt < max_attempts {
                        let delay = calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms);
                        tracing::warn!(
                            target_service = target,
                            attempt,
                            max_attempts,
                            delay = ?delay,
                            error = %err,
                            "Transient upstream failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if err.is_transient() {
                        tracing::error!(
                            target_service = target,
                            attempts = attempt,
                            error = %err,
                            "Upstream retries exhausted"
                        );
                    } else {
                        tracing::debug!(
                            target_service = target,
                            attempt,
                            error = %err,
                            "Non-retryable upstream failure"
                        );
                    }

                    return Err(RetryFailure {
                        attempts: attempt,
                        last_error: err,
                    });
                }
            }
        }
    }
}

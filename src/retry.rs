//! Per-call retry with linear backoff and cancellation.
//!
//! Every completion call goes through [`RetryExecutor::execute`]:
//!
//! | Error | Handling |
//! |-------|----------|
//! | `RateLimited` | wait `rate_limit_step * attempt`, retry |
//! | `ServerError` | wait `server_error_step * attempt`, retry |
//! | anything else | returned immediately |
//!
//! After `max_attempts` the last error is surfaced with its attempt counter
//! set, so a rate limit stays a `RateLimited` for the fallback decision.
//!
//! Both the operation and the backoff sleeps race the caller's
//! [`CancellationToken`]; cancelling drops the in-flight future and yields
//! [`SummaryError::Cancelled`].

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::error::{
    Result, RetryStrategy, SummaryError, RATE_LIMIT_BACKOFF_STEP, SERVER_ERROR_BACKOFF_STEP,
};

/// Attempt ceiling and backoff units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub rate_limit_step: Duration,
    pub server_error_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_step: RATE_LIMIT_BACKOFF_STEP,
            server_error_step: SERVER_ERROR_BACKOFF_STEP,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rate_limit_step: Duration::from_millis(config.rate_limit_backoff_ms),
            server_error_step: Duration::from_millis(config.server_error_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Strategy for `error` with this policy's backoff units.
    ///
    /// Only the error's variant and whether its own strategy retries are
    /// consulted; the step carried by [`SummaryError::retry_strategy`] is
    /// replaced by `rate_limit_step` or `server_error_step`.
    pub fn strategy_for(&self, error: &SummaryError) -> RetryStrategy {
        match error.retry_strategy() {
            RetryStrategy::NoRetry => RetryStrategy::NoRetry,
            RetryStrategy::LinearBackoff { .. } => match error {
                SummaryError::RateLimited { .. } => RetryStrategy::LinearBackoff {
                    step: self.rate_limit_step,
                },
                _ => RetryStrategy::LinearBackoff {
                    step: self.server_error_step,
                },
            },
        }
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(SummaryError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SummaryError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

/// Executor applying a [`RetryPolicy`] to an async operation.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    log_retries: bool,
}

impl RetryExecutor {
    /// Create a new retry executor.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            log_retries: true,
        }
    }

    /// Create a retry executor without logging.
    pub fn silent(policy: RetryPolicy) -> Self {
        Self {
            policy,
            log_retries: false,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts or `cancel` fires.
    ///
    /// `operation` is re-invoked for every attempt and must issue the same
    /// request each time.
    pub async fn execute<F, Fut, T>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(SummaryError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
                outcome = operation() => outcome,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 && self.log_retries {
                        info!(attempt, "Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let strategy = self.policy.strategy_for(&error);
            if !strategy.should_retry() {
                if self.log_retries {
                    debug!("Error is non-retryable, stopping: {}", error);
                }
                return Err(error);
            }

            if attempt >= max_attempts {
                if self.log_retries {
                    warn!(
                        attempt,
                        "Operation failed after {} attempts, giving up: {}", attempt, error
                    );
                }
                return Err(error.with_attempts(attempt));
            }

            let delay = strategy.delay_after(attempt);
            if self.log_retries {
                warn!(
                    attempt,
                    "Attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    error
                );
            }
            sleep_or_cancel(delay, cancel).await?;
        }
    }
}

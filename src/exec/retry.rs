// src/exec/retry.rs

//! Fixed-delay, bounded-attempt retry policy.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// Outcome of a retried operation together with how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub result: Result<T, TaskError>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and is clamped to at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, node: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    warn!(
                        node = %node,
                        attempt,
                        max_attempts = self.max_attempts,
                        error_kind = err.kind(),
                        error = %err,
                        retryable,
                        "node attempt failed"
                    );

                    if matches!(err, TaskError::DataUnavailable(_)) {
                        warn!(
                            node = %node,
                            "evaluation data is missing on the remote side; this is not a model regression"
                        );
                    }

                    if !retryable || attempt >= self.max_attempts {
                        return Attempted {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }
                }
            }

            debug!(node = %node, delay = ?self.delay, "waiting before next attempt");
            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(300))
    }
}

impl From<crate::config::RetryConfig> for RetryPolicy {
    fn from(cfg: crate::config::RetryConfig) -> Self {
        Self::new(cfg.max_attempts, cfg.delay)
    }
}

//! Retry policy shared by every API request

use crate::{FailureKind, FetchError};
use std::future::Future;
use std::time::Duration;

/// How often, how far apart, and for which failures a request is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub interval: Duration,

    /// Failure kinds that earn another attempt
    pub retryable: Vec<FailureKind>,
}

impl RetryPolicy {
    /// Creates a policy retrying rate limits, transport and decode failures
    ///
    /// Structurally wrong responses are never retried; the same request would
    /// produce the same shape again.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            retryable: vec![
                FailureKind::RateLimited,
                FailureKind::Transport,
                FailureKind::Decode,
            ],
        }
    }

    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Pause before the attempt following `attempt` (1-based)
    pub fn backoff(&self, _attempt: u32) -> Duration {
        self.interval
    }

    /// Runs `operation` until it succeeds, fails permanently, or the budget is spent
    ///
    /// The closure receives the 1-based attempt number. The last error is
    /// returned when no attempts remain.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.is_retryable(e.kind()) => {
                    let pause = self.backoff(attempt);
                    tracing::warn!(
                        request = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Request failed, retrying in {:?}",
                        pause
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => {
                    if self.is_retryable(e.kind()) {
                        tracing::warn!(
                            request = label,
                            attempts = attempt,
                            error = %e,
                            "Giving up after {} attempt(s)",
                            attempt
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

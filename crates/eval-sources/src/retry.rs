//! Deadline-aware retries with exponential backoff

use eval_core::{Deadline, remaining};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};

/// Retry policy for provider requests
///
/// Only transient errors are retried, and only while the time left before
/// the deadline exceeds the next backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: config.retry_backoff_base,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self
            .backoff_multiplier
            .powi(i32::try_from(attempt - 1).unwrap_or(i32::MAX));
        let backoff = self.initial_backoff.mul_f64(factor.min(1e6));
        backoff.min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or the deadline leaves no room for another backoff
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        deadline: Deadline,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_transient() || attempt >= self.max_attempts {
                return Err(error);
            }

            let backoff = self.backoff_duration(attempt);
            if remaining(deadline) <= backoff {
                debug!(operation = operation_name, "No time left to retry");
                return Err(error);
            }

            warn!(
                operation = operation_name,
                attempt,
                max_attempts = self.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Transient provider error, retrying"
            );
            sleep(backoff).await;
        }
    }
}

/// Convenience for clients that need the error when a deadline has passed
pub(crate) fn ensure_time_left(deadline: Deadline, what: &'static str) -> Result<()> {
    if remaining(deadline).is_zero() {
        Err(SourceError::Deadline(what))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    fn transient() -> SourceError {
        SourceError::Provider {
            provider: "test",
            status: 503,
            body: String::new(),
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = fast();
        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_duration(10), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = &AtomicU32::new(0);
        let deadline = Instant::now() + Duration::from_secs(5);

        let result = fast()
            .execute("flaky", deadline, move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let deadline = Instant::now() + Duration::from_secs(5);

        let result: Result<()> = fast()
            .execute("broken", deadline, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Parse("bad body".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_when_deadline_is_close() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            initial_backoff: Duration::from_secs(1),
            ..fast()
        };
        let deadline = Instant::now() + Duration::from_millis(200);

        let result: Result<()> = policy
            .execute("slow", deadline, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = &AtomicU32::new(0);
        let deadline = Instant::now() + Duration::from_secs(5);

        let result: Result<()> = fast()
            .execute("down", deadline, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

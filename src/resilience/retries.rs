//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed store write is worth another attempt
//! - Execute attempts with exponential backoff + jitter between them
//! - Bound every attempt with a deadline
//!
//! Only transient failures (`StoreUnavailable`) are retried.

use std::future::Future;
use std::time::Duration;

use crate::error::{RecorderError, Result};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::with_deadline;

/// How a write is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Returns the final result and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> (Result<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match with_deadline(self.attempt_timeout, operation()).await {
                Ok(value) => return (Ok(value), attempt),
                Err(e) if is_retryable(&e) && attempt < max_attempts => {
                    let delay = calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms);
                    tracing::warn!(attempt, delay = ?delay, error = %e, "Store write failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }
}

pub fn is_retryable(error: &RecorderError) -> bool {
    error.is_transient()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            attempt_timeout: Duration::from_millis(100),
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = policy(3)
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RecorderError::StoreUnavailable("down".into()))
                } else {
                    Ok("stored")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "stored");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (result, attempts) = policy(2)
            .run(|| async { Err::<(), _>(RecorderError::StoreUnavailable("down".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (result, attempts) = policy(5)
            .run(|| async { Err::<(), _>(RecorderError::DecodeError("bad".into())) })
            .await;
        assert!(matches!(result, Err(RecorderError::DecodeError(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn hung_attempts_time_out_and_retry() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = policy(2)
            .run(|| {
                let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    if first {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok(())
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(attempts, 2);
    }
}

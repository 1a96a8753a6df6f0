//! Caller-side retry discipline for order submissions
//!
//! The manager never retries on its own: one accepted call is one append.
//! Callers that talk to the store on behalf of a user (cart "send to table",
//! sale recording after settlement) wrap the call in a [`RetryPolicy`].
//!
//! Only errors that report [`Retryable::is_retryable`] are retried: for
//! orders that is [`OrderError::StoreUnavailable`]. A store failure means the
//! transaction did not commit, so repeating it cannot double-append. Business
//! errors (validation, conflict, not found) are returned at once. Once the
//! overall timeout is spent the caller gets the error's timeout variant; a
//! success is always returned, however late it arrives.

use super::manager::OrderError;
use std::time::Duration;
use tokio::time::Instant;

/// Errors a [`RetryPolicy`] knows how to handle
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;

    /// The error reported when the overall budget is spent
    fn timed_out(timeout: Duration) -> Self;
}

impl Retryable for OrderError {
    fn is_retryable(&self) -> bool {
        OrderError::is_retryable(self)
    }

    fn timed_out(timeout: Duration) -> Self {
        OrderError::Timeout(timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled after each failure
    pub backoff: Duration,
    /// Overall budget across all attempts
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Single attempt, no retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::from_secs(3600))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or the timeout is spent.
    pub async fn run<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Result<T, E>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut delay = self.backoff;
        let mut attempt = 1;

        loop {
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                tracing::warn!(attempt, error = %err, "Order submission failed, attempts exhausted");
                return Err(err);
            }

            let now = Instant::now();
            if now >= deadline || now + delay >= deadline {
                tracing::warn!(attempt, error = %err, "Order submission timed out");
                return Err(E::timed_out(self.timeout));
            }

            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying order submission");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StorageError;
    use crate::orders::manager::OrderResult;
    use crate::orders::store::StoreError;

    fn unavailable() -> OrderError {
        OrderError::from(StoreError::Unavailable(StorageError::Io(
            std::io::Error::other("busy"),
        )))
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut calls = 0;
        let result = fast(3)
            .run(|| {
                calls += 1;
                Ok::<_, OrderError>(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retries_store_unavailable_then_succeeds() {
        let mut calls = 0;
        let result = fast(3)
            .run(|| {
                calls += 1;
                if calls < 3 { Err(unavailable()) } else { Ok(calls) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_respects_attempt_cap() {
        let mut calls = 0;
        let result: OrderResult<()> = fast(2)
            .run(|| {
                calls += 1;
                Err(unavailable())
            })
            .await;
        assert!(matches!(result, Err(OrderError::StoreUnavailable(_))));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let mut calls = 0;
        let result: OrderResult<()> = fast(5)
            .run(|| {
                calls += 1;
                Err(OrderError::Conflict("table busy".into()))
            })
            .await;
        assert!(matches!(result, Err(OrderError::Conflict(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_timeout_when_backoff_exceeds_budget() {
        let policy = RetryPolicy::new(10, Duration::from_millis(50), Duration::from_millis(20));
        let mut calls = 0;
        let result: OrderResult<()> = policy
            .run(|| {
                calls += 1;
                Err(unavailable())
            })
            .await;
        assert!(matches!(result, Err(OrderError::Timeout(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.backoff, Duration::from_millis(200));
        assert_eq!(p.timeout, Duration::from_secs(10));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }
}

//! Retry policy for outbound calls that are safe to repeat.
//!
//! GitHub calls are never retried in-process: a failed unit of work is
//! rescheduled instead. Hub pings are idempotent and cheap, so transient
//! transport failures are retried with exponential backoff.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// First backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound on a single backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Retries after the first attempt.
pub const MAX_RETRIES: usize = 3;

/// How often, and how patiently, a repeatable call is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubles on each further one.
    pub first_delay: Duration,
    /// Cap on the delay between two attempts.
    pub max_delay: Duration,
    /// Retries after the first attempt. Zero disables retrying.
    pub retries: usize,
    /// Randomize delays so concurrent workers do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            retries: MAX_RETRIES,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry `retries` times with the same `delay` between attempts.
    #[must_use]
    pub fn fixed(delay: Duration, retries: usize) -> Self {
        Self {
            first_delay: delay,
            max_delay: delay,
            retries,
            jitter: false,
        }
    }

    /// Try once and give up.
    #[must_use]
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.first_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.retries);

        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Run `operation`, retrying while `should_retry` accepts the error.
    ///
    /// `what` names the call in the debug log emitted before each retry.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        what: &str,
        operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let attempt = AtomicU32::new(1);

        operation
            .retry(self.backoff())
            .notify(|err, delay| {
                tracing::debug!(
                    attempt = attempt.fetch_add(1, Ordering::Relaxed),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "{what} failed, retrying"
                );
            })
            .when(should_retry)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn counting(
        calls: &Arc<AtomicU32>,
        fail_first: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, &'static str>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < fail_first {
                Err("connection reset")
            } else {
                Ok(n + 1)
            })
        }
    }

    #[test]
    fn test_default_policy_uses_hub_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.first_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(policy.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(policy.retries, MAX_RETRIES);
        assert!(policy.jitter);
    }

    #[test]
    fn test_fixed_policy_has_no_growth_or_jitter() {
        let policy = RetryPolicy::fixed(Duration::from_millis(3), 2);
        assert_eq!(policy.first_delay, policy.max_delay);
        assert!(!policy.jitter);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::fixed(Duration::from_millis(1), 5)
            .run("Hub ping", counting(&calls, 2), |_| true)
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::fixed(Duration::from_millis(1), 5)
            .run("Hub ping", counting(&calls, u32::MAX), |_| false)
            .await;

        assert_eq!(result, Err("connection reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_stop_at_the_limit() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::fixed(Duration::from_millis(1), 2)
            .run("Hub ping", counting(&calls, u32::MAX), |_| true)
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_none_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::none()
            .run("Hub ping", counting(&calls, 1), |_| true)
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Retry logic with exponential backoff for API calls
//!
//! Retry is opt-in: wrap an endpoint call in [`run_with_retry`] to have transient
//! classified failures (network, timeout, 5xx) retried with geometric backoff.
//! Anything that is not a [`ClassifiedError`] propagates on the first attempt.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::error::{Error, Result};
use crate::http::error::ClassifiedError;

/// Predicate deciding whether a classified failure on a given zero-based attempt may be retried
pub type ShouldRetry = Arc<dyn Fn(&ClassifiedError, u32) -> bool + Send + Sync>;

/// Retry policy configuration
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub base_delay: Duration,
    /// Factor applied to the wait after every retry
    pub backoff_multiplier: f64,
    /// Randomize waits to spread out concurrent clients
    pub jitter: bool,
    should_retry: ShouldRetry,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter: false,
            should_retry: Arc::new(|error, _attempt| error.is_retryable()),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the retry predicate
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ClassifiedError, u32) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Whether `error` on zero-based `attempt` may be retried under this policy
    pub fn should_retry(&self, error: &ClassifiedError, attempt: u32) -> bool {
        attempt < self.max_retries && (self.should_retry)(error, attempt)
    }

    /// Wait after the failure of zero-based `attempt`: `base_delay * multiplier^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.base_delay
            .mul_f64(self.backoff_multiplier.powi(exponent).clamp(0.0, u32::MAX as f64))
    }

    /// Create an exponential backoff instance yielding the policy's waits in order
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            multiplier: self.backoff_multiplier,
            max_interval: Duration::MAX,
            max_elapsed_time: None, // We handle max retries separately
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        backoff
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// Tracks attempts for one logical call
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    attempt: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            attempt: 0,
            backoff,
        }
    }

    /// Decide what to do after the current attempt failed with `error`
    pub fn on_failure(&mut self, error: &ClassifiedError) -> RetryDecision {
        if !self.policy.should_retry(error, self.attempt) {
            return RetryDecision::NoRetry;
        }

        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or_else(|| self.policy.delay_for(self.attempt));
        self.attempt += 1;

        RetryDecision::Retry { delay }
    }

    /// Zero-based number of the attempt currently running
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset the handler for a new logical call
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.backoff.reset();
    }
}

/// Run `operation`, retrying classified failures the policy allows.
///
/// At most `max_retries + 1` attempts are made. The error of the last attempt is
/// returned unchanged; unclassified errors are returned without any retry.
pub async fn run_with_retry<F, Fut, T>(mut operation: F, policy: &RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut handler = RetryHandler::new(policy.clone());

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(Error::Api(error)) => error,
            Err(other) => {
                tracing::debug!(error = %other, "Unclassified failure, not retrying");
                return Err(other);
            }
        };

        match handler.on_failure(&error) {
            RetryDecision::Retry { delay } => {
                tracing::warn!(
                    attempt = handler.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    status = error.status(),
                    "Request failed, retrying: {}",
                    error
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::NoRetry => {
                tracing::error!(
                    attempts = handler.attempt() + 1,
                    status = error.status(),
                    retryable = error.is_retryable(),
                    "Request failed, not retrying: {}",
                    error
                );
                return Err(Error::Api(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn server_error() -> ClassifiedError {
        ClassifiedError::from_status(503, "Service Unavailable", None)
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert!(!policy.jitter);
    }

    #[test]
    fn test_delay_for_is_geometric() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_handler_uses_backoff_sequence() {
        let mut handler = RetryHandler::new(RetryPolicy::default());
        let error = server_error();

        assert_eq!(
            handler.on_failure(&error),
            RetryDecision::Retry { delay: Duration::from_millis(1000) }
        );
        assert_eq!(
            handler.on_failure(&error),
            RetryDecision::Retry { delay: Duration::from_millis(2000) }
        );
        assert_eq!(
            handler.on_failure(&error),
            RetryDecision::Retry { delay: Duration::from_millis(4000) }
        );
        assert_eq!(handler.on_failure(&error), RetryDecision::NoRetry);
        assert_eq!(handler.attempt(), 3);

        handler.reset();
        assert_eq!(handler.attempt(), 0);
    }

    #[test]
    fn test_non_retryable_errors() {
        let mut handler = RetryHandler::new(RetryPolicy::default());
        let client_error = ClassifiedError::from_status(400, "Bad Request", None);
        assert_eq!(handler.on_failure(&client_error), RetryDecision::NoRetry);

        let auth_error = ClassifiedError::from_status(401, "Unauthorized", None);
        assert_eq!(handler.on_failure(&auth_error), RetryDecision::NoRetry);
    }

    #[test]
    fn test_custom_predicate_sees_attempt() {
        let policy = RetryPolicy::default().with_should_retry(|error, attempt| error.is_timeout() && attempt == 0);
        assert!(policy.should_retry(&ClassifiedError::timeout(), 0));
        assert!(!policy.should_retry(&ClassifiedError::timeout(), 1));
        assert!(!policy.should_retry(&server_error(), 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_exhausted() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(2);
        let started = Instant::now();

        let result: Result<()> = run_with_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Err(ClassifiedError::from_status(503, format!("attempt {}", n), None).into())
                }
            },
            &policy,
        )
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let error = result.unwrap_err();
        assert_eq!(error.classified().unwrap().status_text(), "attempt 3");
        // 1000ms + 2000ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let result = run_with_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ClassifiedError::network().into())
                    } else {
                        Ok("done")
                    }
                }
            },
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ClassifiedError::from_status(422, "Unprocessable Entity", None).into()) }
            },
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().classified().unwrap().is_validation_error());
    }

    #[tokio::test]
    async fn test_unclassified_error_propagates_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("bug").into()) }
            },
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::Internal { .. })));
    }

    proptest! {
        #[test]
        fn prop_attempts_bounded(max_retries in 0u32..6, fail_first in 0u32..10) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let attempts = AtomicU32::new(0);
            let policy = RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(10));
            let result: Result<u32> = runtime.block_on(run_with_retry(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < fail_first {
                            Err(ClassifiedError::timeout().into())
                        } else {
                            Ok(n)
                        }
                    }
                },
                &policy,
            ));

            let made = attempts.load(Ordering::SeqCst);
            prop_assert!(made <= max_retries + 1);
            prop_assert_eq!(result.is_ok(), fail_first <= max_retries);
        }
    }
}

//! Retry wrapper with exponential backoff

use super::types::{Completion, CompletionError, CompletionService, RetryPolicy};
use async_trait::async_trait;

/// Adds retry logic to any completion service
pub struct RetryCompletion<T: CompletionService> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: CompletionService> RetryCompletion<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: CompletionService> CompletionService for RetryCompletion<T> {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, CompletionError> {
        let mut attempt = 0;

        loop {
            match self.inner.complete(prompt, model).await {
                Ok(completion) => return Ok(completion),
                Err(e) if !e.is_retryable() || attempt >= self.policy.max_retries => {
                    return Err(e);
                }
                Err(e) => {
                    // Prefer the server-specified delay, bounded by the policy
                    let delay = e
                        .retry_after()
                        .map(|d| d.min(self.policy.max_delay))
                        .unwrap_or_else(|| self.policy.delay_for_attempt(attempt));

                    tracing::warn!(
                        service = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        ?delay,
                        error = %e,
                        "Completion failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Wrap a service with a retry policy
pub fn with_retry<T: CompletionService>(service: T, policy: RetryPolicy) -> RetryCompletion<T> {
    RetryCompletion::new(service, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails a set number of times before succeeding
    struct FlakyCompletion {
        calls: AtomicU32,
        fail_times: u32,
        error: CompletionError,
    }

    impl FlakyCompletion {
        fn new(fail_times: u32, error: CompletionError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_times,
                error,
            }
        }

        fn retryable(fail_times: u32) -> Self {
            Self::new(fail_times, CompletionError::rate_limit(None))
        }

        fn non_retryable(fail_times: u32) -> Self {
            Self::new(fail_times, CompletionError::auth("invalid token"))
        }
    }

    #[async_trait]
    impl CompletionService for FlakyCompletion {
        async fn complete(&self, _prompt: &str, model: &str) -> Result<Completion, CompletionError> {
            let count = self.calls.fetch_add(1, Ordering::SeqCst);
            if count < self.fail_times {
                Err(self.error.clone())
            } else {
                Ok(Completion::new("success", model, Duration::from_millis(1)))
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let service = with_retry(FlakyCompletion::retryable(2), fast_policy(3));

        let result = service.complete("test", "m").await.unwrap();
        assert_eq!(result.text, "success");
        assert_eq!(service.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let service = with_retry(FlakyCompletion::retryable(10), fast_policy(2));

        let err = service.complete("test", "m").await.unwrap_err();
        assert!(matches!(err, CompletionError::RateLimit { .. }));
        assert_eq!(service.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_non_retryable() {
        let service = with_retry(FlakyCompletion::non_retryable(10), fast_policy(5));

        let err = service.complete("test", "m").await.unwrap_err();
        assert!(matches!(err, CompletionError::Auth { .. }));
        assert_eq!(service.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_delay_capped_by_policy() {
        let error = CompletionError::rate_limit(Some(Duration::from_secs(1_000_000)));
        let policy = RetryPolicy {
            max_delay: Duration::from_millis(10),
            ..fast_policy(1)
        };
        let service = with_retry(FlakyCompletion::new(1, error), policy);

        let started = std::time::Instant::now();
        let result = service.complete("test", "m").await.unwrap();

        assert_eq!(result.text, "success");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_name_passes_through() {
        let service = with_retry(FlakyCompletion::retryable(0), RetryPolicy::default());
        assert_eq!(service.name(), "flaky");
    }
}

//! Retry with exponential backoff for page fetches

use std::time::Duration;

use crate::error::FetchError;
use crate::http::{Params, Transport};

/// Attempt budget and backoff base for a retrying operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps (tests, tooling)
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after the failed attempt `attempt` (0-based): base, 2x base, 4x base, ...
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// `is_retryable` decides whether an error consumes budget or fails at once.
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion / non-retryable error.
pub fn retry_with_backoff<T, E: std::fmt::Display>(
    label: &str,
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 < max_attempts && is_retryable(&e) => {
                let delay = policy.delay(attempt);
                attempt += 1;
                log::warn!("{label}: attempt {attempt}/{max_attempts} failed: {e}, retrying in {delay:?}");
                std::thread::sleep(delay);
            }
            Err(e) => {
                log::error!("{label}: failed permanently after {} attempt(s): {e}", attempt + 1);
                return Err(e);
            }
        }
    }
}

/// GET with bounded retries; the only place transient network faults are absorbed.
pub struct RetryingFetcher<'a, T: Transport> {
    transport: &'a T,
    policy: RetryPolicy,
}

impl<'a, T: Transport> RetryingFetcher<'a, T> {
    pub fn new(transport: &'a T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn fetch(&self, url: &str, params: &Params, timeout: Duration) -> Result<String, FetchError> {
        retry_with_backoff(url, &self.policy, FetchError::is_retryable, || {
            self.transport.get(url, params, timeout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Transport that answers `status` for the first `failures` calls
    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        status: u16,
    }

    impl Flaky {
        fn new(failures: u32, status: u16) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                status,
            }
        }
    }

    impl Transport for Flaky {
        fn get(&self, _: &str, _: &Params, _: Duration) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(FetchError::Http {
                    status: self.status,
                    message: "flaky".into(),
                })
            } else {
                Ok("<html></html>".into())
            }
        }
    }

    #[test]
    fn backoff_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let t = Flaky::new(2, 503);
        let f = RetryingFetcher::new(&t, RetryPolicy::immediate(3));
        assert!(f.fetch("http://x", &[], Duration::from_secs(1)).is_ok());
        assert_eq!(t.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn stops_at_attempt_ceiling() {
        let t = Flaky::new(u32::MAX, 503);
        let f = RetryingFetcher::new(&t, RetryPolicy::immediate(4));
        let err = f.fetch("http://x", &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
        assert_eq!(t.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn permanent_error_not_retried() {
        let t = Flaky::new(u32::MAX, 404);
        let f = RetryingFetcher::new(&t, RetryPolicy::immediate(5));
        assert!(f.fetch("http://x", &[], Duration::from_secs(1)).is_err());
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }
}

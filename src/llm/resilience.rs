//! Bounded retry for external model calls.
//!
//! Transient provider failures (timeouts, connection resets, rate
//! limits) get a fixed number of retries with a fixed backoff. Anything
//! else fails the call immediately; the pipeline never retries on its
//! own above this layer.

use super::Generator;
use crate::{Error, Result};
use std::time::{Duration, Instant};

/// Retry configuration for model calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries for retryable failures.
    pub max_retries: u32,
    /// Backoff between retries in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
        }
    }
}

/// Runs a model call under a retry policy, recording metrics.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or immediately for
/// non-retryable failures.
pub fn execute_with_retry<T, F>(
    provider: &'static str,
    operation: &'static str,
    policy: RetryPolicy,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_attempts {
        attempts += 1;
        let started = Instant::now();
        match call() {
            Ok(value) => {
                record_request(provider, operation, started, "success");
                return Ok(value);
            },
            Err(err) => {
                let retryable = is_retryable_error(&err) && attempts < max_attempts;
                record_request(
                    provider,
                    operation,
                    started,
                    if retryable { "retried" } else { "error" },
                );
                if !retryable {
                    return Err(err);
                }
                tracing::warn!(
                    provider,
                    operation,
                    attempt = attempts,
                    "Retrying model call: {err}"
                );
                metrics::counter!(
                    "model_retries_total",
                    "provider" => provider,
                    "operation" => operation
                )
                .increment(1);
                if policy.backoff_ms > 0 {
                    std::thread::sleep(Duration::from_millis(policy.backoff_ms));
                }
                last_error = Some(err);
            },
        }
    }

    Err(last_error.unwrap_or_else(|| Error::OperationFailed {
        operation: format!("{provider}_{operation}"),
        cause: "exhausted retries".to_string(),
    }))
}

fn record_request(provider: &'static str, operation: &'static str, started: Instant, status: &'static str) {
    metrics::counter!(
        "model_requests_total",
        "provider" => provider,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "model_request_duration_ms",
        "provider" => provider,
        "operation" => operation
    )
    .record(started.elapsed().as_secs_f64() * 1000.0);
}

/// Whether an error looks like a transient transport/provider fault.
fn is_retryable_error(err: &Error) -> bool {
    match err {
        Error::OperationFailed { cause, .. } | Error::IndexUnavailable(cause) => {
            let lower = cause.to_lowercase();
            lower.contains("timeout")
                || lower.contains("timed out")
                || lower.contains("connection")
                || lower.contains("429")
                || lower.contains("too many requests")
                || lower.contains("500")
                || lower.contains("502")
                || lower.contains("503")
                || lower.contains("504")
                || lower.contains("unavailable")
                || lower.contains("overloaded")
        },
        _ => false,
    }
}

/// Generator wrapper applying the retry policy to every call.
pub struct ResilientGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> ResilientGenerator<G> {
    /// Wraps a generator with a retry policy.
    #[must_use]
    pub const fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<G: Generator> Generator for ResilientGenerator<G> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn generate(&self, system: &str, user: &str) -> Result<String> {
        execute_with_retry(self.inner.name(), "generate", self.policy, || {
            self.inner.generate(system, user)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyGenerator {
        calls: AtomicU32,
        fail_first: u32,
        cause: &'static str,
    }

    impl Generator for FlakyGenerator {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(Error::OperationFailed {
                    operation: "generate".to_string(),
                    cause: self.cause.to_string(),
                })
            } else {
                Ok("answer".to_string())
            }
        }
    }

    #[test]
    fn test_retries_transient_failures() {
        let inner = FlakyGenerator {
            calls: AtomicU32::new(0),
            fail_first: 2,
            cause: "connection reset by peer",
        };
        let generator = ResilientGenerator::new(
            inner,
            RetryPolicy {
                max_retries: 2,
                backoff_ms: 0,
            },
        );
        let result = generator.generate("system", "user");
        assert_eq!(result.ok().as_deref(), Some("answer"));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_does_not_retry_permanent_failures() {
        let inner = FlakyGenerator {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            cause: "invalid api key",
        };
        let generator = ResilientGenerator::new(
            inner,
            RetryPolicy {
                max_retries: 3,
                backoff_ms: 0,
            },
        );
        assert!(generator.generate("system", "user").is_err());
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exhausts_retries_and_returns_last_error() {
        let inner = FlakyGenerator {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            cause: "request timed out",
        };
        let generator = ResilientGenerator::new(
            inner,
            RetryPolicy {
                max_retries: 1,
                backoff_ms: 0,
            },
        );
        let err = generator.generate("system", "user").map(|_| ());
        assert!(err.is_err());
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_none_policy_makes_single_attempt() {
        let inner = FlakyGenerator {
            calls: AtomicU32::new(0),
            fail_first: 1,
            cause: "request timed out",
        };
        let generator = ResilientGenerator::new(inner, RetryPolicy::none());
        assert!(generator.generate("system", "user").is_err());
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }
}

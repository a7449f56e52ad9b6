//! Retry utilities for resilient operations
//!
//! Provides a common retry mechanism used by the feed fetcher and the
//! translation call sites. Backoff is fixed by default (the delivery
//! pipeline retries on a flat 2 second cadence) but supports an
//! exponential multiplier for callers that want it.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Base delay in milliseconds between attempts
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt (1.0 = fixed backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // 3 total attempts, 2s apart
        Self::fixed(2, 2_000)
    }
}

impl RetryConfig {
    /// Fixed backoff: every retry waits the same delay
    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            backoff_multiplier: 1.0,
        }
    }

    /// Exponential backoff with a delay cap
    pub fn exponential(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Total number of attempts including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Calculate delay for a given attempt
    pub(crate) fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let scaled =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (scaled as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with retry logic
///
/// Returns `Ok(T)` on the first success, or the last error once all
/// attempts are exhausted.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed"
                );
                last_error = Some(e);
            }
        }
    }

    // max_retries >= 0 guarantees at least one attempt ran
    Err(last_error.expect("retry loop ran at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_success_first_attempt() {
        let config = RetryConfig::fixed(3, 1);
        let result: Result<i32, String> =
            tokio_test::block_on(with_retry(&config, || async { Ok(42) }));
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let config = RetryConfig::fixed(3, 1);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32, String> = with_retry(&config, move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err("simulated failure".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = RetryConfig::fixed(2, 1);
        let result: Result<(), String> =
            with_retry(&config, || async { Err("permanent failure".to_string()) }).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("permanent failure"));
    }

    #[test]
    fn test_fixed_delay() {
        let config = RetryConfig::fixed(3, 2_000);

        assert_eq!(config.calculate_delay(0), Duration::from_millis(0));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(2_000));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(2_000));
    }

    #[test]
    fn test_exponential_delay_cap() {
        let config = RetryConfig::exponential(10, 1_000, 5_000);

        assert_eq!(config.calculate_delay(1), Duration::from_millis(1_000));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(2_000));
        assert_eq!(config.calculate_delay(10), Duration::from_millis(5_000));
    }

    #[test]
    fn test_attempts_count() {
        assert_eq!(RetryConfig::fixed(2, 2_000).attempts(), 3);
    }
}

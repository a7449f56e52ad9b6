//! Translation with provider failover
//!
//! Two providers are configured: Google Translate (primary) and DeepL
//! (secondary). When a call fails the service switches to the other
//! provider and keeps using it for every subsequent call in the process,
//! across all tenants, until that one fails in turn. The flag is never
//! reset on success.

pub mod providers;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::retry::RetryConfig;

pub use providers::{DeeplProvider, GoogleProvider};

/// Errors from translation providers
#[derive(Error, Debug)]
pub enum TranslationError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status
    #[error("{provider} returned status {status}")]
    Api { provider: &'static str, status: u16 },

    /// Provider response did not contain a translation
    #[error("{provider} response carried no translation")]
    MalformedResponse { provider: &'static str },

    /// Every attempt across both providers failed
    #[error("translation failed after {attempts} attempts: {last}")]
    AllProvidersFailed { attempts: u32, last: String },
}

impl TranslationError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::AllProvidersFailed { .. })
    }
}

/// A translation backend
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Translate plain text into the target language
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslationError>;
}

/// Translation front-end holding both providers and the failover flag
pub struct TranslationService {
    providers: [Box<dyn TranslationProvider>; 2],
    active: AtomicUsize,
    retry: RetryConfig,
}

impl TranslationService {
    /// Build from two providers, primary first
    pub fn new(
        primary: Box<dyn TranslationProvider>,
        secondary: Box<dyn TranslationProvider>,
    ) -> Self {
        Self {
            providers: [primary, secondary],
            active: AtomicUsize::new(0),
            retry: RetryConfig::default(),
        }
    }

    /// Build the Google + DeepL pair from configuration
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::Http` if an HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, TranslationError> {
        let google = GoogleProvider::new(
            &config.google_api_key,
            config.request_timeout(),
            &config.http.user_agent,
        )?;
        let deepl = DeeplProvider::new(
            &config.deepl_api_key,
            config.request_timeout(),
            &config.http.user_agent,
        )?;
        Ok(Self::new(Box::new(google), Box::new(deepl)))
    }

    /// Override the retry policy (used by tests to avoid real backoff)
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Name of the provider currently in use
    pub fn active_provider(&self) -> &'static str {
        self.providers[self.active.load(Ordering::SeqCst)].name()
    }

    /// Translate text, switching providers on failure
    ///
    /// Empty input short-circuits to an empty result without a provider
    /// call. Each failed attempt flips the active provider before the
    /// next try; the flip is permanent for the life of the process.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::AllProvidersFailed` once the attempt
    /// budget is exhausted.
    pub async fn translate(&self, text: &str, target: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let mut last_error = None;

        for attempt in 0..self.retry.attempts() {
            if attempt > 0 {
                tokio::time::sleep(self.retry.calculate_delay(attempt)).await;
            }

            let index = self.active.load(Ordering::SeqCst);
            let provider = &self.providers[index];

            match provider.translate(text, target).await {
                Ok(translated) => {
                    debug!(provider = provider.name(), "Translation succeeded");
                    return Ok(translated);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        attempt = attempt,
                        error = %e,
                        "Translation attempt failed, switching provider"
                    );
                    // Another task may have flipped it already; that is fine
                    let _ = self.active.compare_exchange(
                        index,
                        1 - index,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(TranslationError::AllProvidersFailed {
            attempts: self.retry.attempts(),
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| String::from("unknown")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    struct ScriptedProvider {
        name: &'static str,
        fail_first: u32,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, fail_first: u32) -> (Box<Self>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Box::new(Self {
                    name,
                    fail_first,
                    calls: Arc::clone(&calls),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl TranslationProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn translate(&self, text: &str, _target: &str) -> Result<String, TranslationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(TranslationError::Api {
                    provider: self.name,
                    status: 500,
                })
            } else {
                Ok(format!("[{}] {}", self.name, text))
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::fixed(2, 1)
    }

    #[tokio::test]
    async fn test_primary_used_while_healthy() {
        let (google, _) = ScriptedProvider::new("google", 0);
        let (deepl, deepl_calls) = ScriptedProvider::new("deepl", 0);
        let service = TranslationService::new(google, deepl).with_retry(fast_retry());

        let out = service.translate("hello", "zh").await.unwrap();
        assert_eq!(out, "[google] hello");
        assert_eq!(deepl_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.active_provider(), "google");
    }

    #[tokio::test]
    async fn test_failover_persists_across_calls() {
        let (google, google_calls) = ScriptedProvider::new("google", u32::MAX);
        let (deepl, _) = ScriptedProvider::new("deepl", 0);
        let service = TranslationService::new(google, deepl).with_retry(fast_retry());

        let out = service.translate("first", "zh").await.unwrap();
        assert_eq!(out, "[deepl] first");
        assert_eq!(service.active_provider(), "deepl");

        // Later calls stay on the secondary; the flag never resets
        let out = service.translate("second", "zh").await.unwrap();
        assert_eq!(out, "[deepl] second");
        assert_eq!(google_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_exhausts_budget() {
        let (google, google_calls) = ScriptedProvider::new("google", u32::MAX);
        let (deepl, deepl_calls) = ScriptedProvider::new("deepl", u32::MAX);
        let service = TranslationService::new(google, deepl).with_retry(fast_retry());

        let err = service.translate("doomed", "zh").await.unwrap_err();
        assert!(matches!(err, TranslationError::AllProvidersFailed { attempts: 3, .. }));
        // Alternation: google, deepl, google
        assert_eq!(google_calls.load(Ordering::SeqCst), 2);
        assert_eq!(deepl_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_text_skips_provider_call() {
        let (google, google_calls) = ScriptedProvider::new("google", 0);
        let (deepl, _) = ScriptedProvider::new("deepl", 0);
        let service = TranslationService::new(google, deepl).with_retry(fast_retry());

        let out = service.translate("   ", "zh").await.unwrap();
        assert!(out.is_empty());
        assert_eq!(google_calls.load(Ordering::SeqCst), 0);
    }
}

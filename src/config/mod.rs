//! Startup configuration for babelfeed
//!
//! Configuration is read once from environment variables at process start.
//! Translation-provider credentials and the delivery access token are
//! mandatory; the process refuses to start without them. Everything else
//! has a sensible default.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure
///
/// Secrets are intentionally not serialized.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Translate API key (primary provider)
    pub google_api_key: String,

    /// DeepL API key (secondary provider)
    pub deepl_api_key: String,

    /// Access token for the delivery API
    pub access_token: String,

    /// Base URL of the delivery API
    pub api_base: String,

    /// Directory holding per-tenant JSON records
    pub data_dir: PathBuf,

    /// HTTP behavior for feed fetching and provider calls
    pub http: HttpConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config(format!("missing required environment variable {name}")))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any required credential is missing or
    /// empty. This is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let google_api_key = required("GOOGLE_TRANSLATE_API_KEY")?;
        let deepl_api_key = required("DEEPL_API_KEY")?;
        let access_token = required("BABELFEED_ACCESS_TOKEN")?;

        let api_base = std::env::var("BABELFEED_API_BASE")
            .unwrap_or_else(|_| String::from("https://discord.com/api/v10"));

        let data_dir = std::env::var("BABELFEED_DATA_DIR")
            .unwrap_or_else(|_| String::from("data/tenants"))
            .into();

        let request_timeout_secs = std::env::var("BABELFEED_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let user_agent = std::env::var("BABELFEED_USER_AGENT")
            .unwrap_or_else(|_| format!("babelfeed/{}", env!("CARGO_PKG_VERSION")));

        let level = std::env::var("BABELFEED_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format = std::env::var("BABELFEED_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            google_api_key,
            deepl_api_key,
            access_token,
            api_base,
            data_dir,
            http: HttpConfig {
                request_timeout_secs,
                user_agent,
            },
            logging: LoggingConfig { level, format },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.request_timeout_secs == 0 {
            return Err(Error::config("request timeout must be greater than 0"));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(Error::config(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required_vars() {
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "g-key");
        std::env::set_var("DEEPL_API_KEY", "d-key");
        std::env::set_var("BABELFEED_ACCESS_TOKEN", "token");
    }

    fn clear_vars() {
        for name in [
            "GOOGLE_TRANSLATE_API_KEY",
            "DEEPL_API_KEY",
            "BABELFEED_ACCESS_TOKEN",
            "BABELFEED_API_BASE",
            "BABELFEED_DATA_DIR",
            "BABELFEED_REQUEST_TIMEOUT",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_with_defaults() {
        clear_vars();
        set_required_vars();

        let config = Config::from_env().unwrap();
        assert_eq!(config.google_api_key, "g-key");
        assert_eq!(config.data_dir, PathBuf::from("data/tenants"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_missing_credential_is_fatal() {
        clear_vars();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "g-key");
        // DEEPL_API_KEY intentionally absent

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DEEPL_API_KEY"));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_empty_credential_is_fatal() {
        clear_vars();
        set_required_vars();
        std::env::set_var("BABELFEED_ACCESS_TOKEN", "  ");

        assert!(Config::from_env().is_err());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_api_base_rejected() {
        clear_vars();
        set_required_vars();
        std::env::set_var("BABELFEED_API_BASE", "not-a-url");

        assert!(Config::from_env().is_err());

        clear_vars();
    }
}

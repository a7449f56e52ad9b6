//! Unified error handling for the babelfeed crate
//!
//! Each domain module defines its own error enum; this module wraps them
//! into a single [`Error`] type usable across module boundaries.
//!
//! Per-item errors (fetch, translate, delivery) are caught close to where
//! they occur and converted to drop-and-log; only store-level I/O failures
//! escalate far enough to abort a tenant cycle.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::delivery::ChannelError;
pub use crate::fetcher::FetchError;
pub use crate::tenant::StoreError;
pub use crate::translate::TranslationError;

/// Unified error type for the babelfeed crate
#[derive(Error, Debug)]
pub enum Error {
    /// Feed fetching or parsing errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Translation provider errors
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Tenant store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Delivery channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration errors (missing credentials, invalid values)
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is recoverable (worth retrying)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Translation(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::Channel(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_recoverable() {
        let err = Error::config("missing DEEPL_API_KEY");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_fetch_error_conversion() {
        let fetch = FetchError::Timeout;
        let unified: Error = fetch.into();
        assert!(matches!(unified, Error::Fetch(_)));
        assert!(unified.is_recoverable());
    }

    #[test]
    fn test_store_error_display() {
        let err = Error::Store(StoreError::MalformedRecord {
            path: "data/tenants/42.json".into(),
            reason: "missing field `interval_minutes`".into(),
        });
        assert!(err.to_string().contains("42.json"));
    }
}

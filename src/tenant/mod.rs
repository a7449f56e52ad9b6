//! Per-tenant records and persistence
//!
//! A tenant is one independently configured consumer (one community or
//! server) with its own feed list, target language, output channel, cycle
//! interval, and dedup ledger. Records are stored as one pretty-printed
//! JSON file per tenant, named by tenant id.

mod store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub use store::{CycleSnapshot, TenantStore};

/// How long a delivered entry stays in the dedup ledger
pub const ENTRY_LIFETIME_DAYS: i64 = 7;

/// Default cycle interval in minutes for new tenants
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Default target language for new tenants
pub const DEFAULT_LANGUAGE: &str = "zh";

/// Target languages accepted by both translation providers
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "it", "ja", "lt", "lv", "nl",
    "pl", "pt", "ro", "ru", "sk", "sl", "sv", "zh",
];

/// Feed list a tenant starts with before any configuration
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.a.dj.com/rss/RSSOpinion.xml",
    "https://feeds.a.dj.com/rss/WSJcomUSBusiness.xml",
    "https://www.foreignaffairs.com/rss.xml",
    "https://www.ft.com/opinion?format=rss",
    "https://www.reutersagency.com/feed/?best-types=reuters-news-first&post_type=best",
    "https://www.reutersagency.com/feed/?best-types=the-big-picture&post_type=best",
    "https://www.theatlantic.com/feed/all/",
    "https://www.economist.com/special-report/rss.xml",
    "https://www.economist.com/the-economist-explains/rss.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
    "https://feeds.bloomberg.com/economics/news.rss",
    "https://feeds.bloomberg.com/bview/news.rss",
    "https://theconversation.com/global/home-page.atom",
    "https://nautil.us/feed/",
    "https://longreads.com/feed",
    "https://blog.cloudflare.com/rss",
    "https://www.eff.org/rss/updates.xml",
];

/// Check whether a language code is in the supported set
pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// Errors from the tenant store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure reading or writing a record
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A persisted record that cannot be parsed or fails validation
    #[error("Malformed tenant record {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    /// Serialization failure while persisting
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// I/O failures are often transient; malformed records are not
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// One delivered entry remembered for dedup purposes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Entry link, the identity key
    pub link: String,

    /// When the entry was first delivered
    pub first_seen: DateTime<Utc>,
}

/// Persisted configuration and ledger for a single tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Tenant identifier
    pub id: u64,

    /// Output channel reference; deliveries are skipped while unset
    pub channel: Option<String>,

    /// Target language code from [`SUPPORTED_LANGUAGES`]
    pub language: String,

    /// Ordered, unique feed URLs
    pub feeds: Vec<String>,

    /// Cycle interval in minutes, always positive
    pub interval_minutes: u32,

    /// Dedup ledger of previously delivered entries
    #[serde(default)]
    pub ledger: Vec<LedgerEntry>,
}

impl TenantRecord {
    /// Create a record with default feeds and settings
    pub fn with_defaults(id: u64) -> Self {
        Self {
            id,
            channel: None,
            language: DEFAULT_LANGUAGE.to_string(),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            ledger: Vec::new(),
        }
    }

    /// Validate record invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_minutes == 0 {
            return Err("interval_minutes must be positive".to_string());
        }

        if !is_supported_language(&self.language) {
            return Err(format!("unsupported language '{}'", self.language));
        }

        let mut seen = std::collections::HashSet::new();
        for feed in &self.feeds {
            if !seen.insert(feed.as_str()) {
                return Err(format!("duplicate feed URL '{feed}'"));
            }
        }

        Ok(())
    }

    /// Drop ledger entries older than [`ENTRY_LIFETIME_DAYS`]
    ///
    /// Returns the number of entries removed.
    pub fn prune_ledger(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(ENTRY_LIFETIME_DAYS);
        let before = self.ledger.len();
        self.ledger.retain(|entry| entry.first_seen > cutoff);
        before - self.ledger.len()
    }

    /// Check whether a link has already been delivered
    pub fn ledger_contains(&self, link: &str) -> bool {
        self.ledger.iter().any(|entry| entry.link == link)
    }
}

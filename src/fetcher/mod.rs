//! Concurrent RSS/Atom feed fetching
//!
//! Each feed URL is fetched and parsed independently. A URL that keeps
//! failing after the retry budget contributes nothing for the cycle and
//! never blocks or delays the other URLs.

pub mod extract;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::retry::{with_retry, RetryConfig};

/// Errors that can occur while fetching or parsing a feed
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Feed content could not be parsed as RSS or Atom
    #[error("Feed parse failed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl FetchError {
    /// Whether a retry has any chance of succeeding
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::Parse(_) => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
        }
    }
}

/// One feed entry as extracted from a parsed feed, before translation
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Entry title (plain text, never empty)
    pub title: String,

    /// Summary stripped to plain text; may be empty
    pub summary: String,

    /// Entry link, the identity key for dedup
    pub link: String,

    /// Published timestamp normalized to UTC, if the feed carried one
    pub published: Option<DateTime<Utc>>,

    /// Feed-declared source label, if any
    pub source: Option<String>,

    /// Image URLs found in the entry markup
    pub images: Vec<String>,
}

/// HTTP fetcher for RSS/Atom feeds with per-URL retry
pub struct FeedFetcher {
    client: Client,
    retry: RetryConfig,
}

impl FeedFetcher {
    /// Create a fetcher with the given request timeout and user agent
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self {
            client,
            retry: RetryConfig::default(),
        })
    }

    /// Override the retry policy (used by tests to avoid real backoff)
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch all URLs concurrently, flattening results
    ///
    /// Per-URL failures are logged and yield nothing; within one feed the
    /// entry order is preserved.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<RawEntry> {
        let fetches = urls.iter().map(|url| async move {
            match self.fetch_feed(url).await {
                Ok(entries) => {
                    debug!(url = %url, entries = entries.len(), "Fetched feed");
                    entries
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Feed failed after retries, skipping for this cycle");
                    Vec::new()
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Fetch and parse a single feed URL with retry
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        with_retry(&self.retry, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let feed_title = feed.title.map(|t| t.content);

        Ok(feed
            .entries
            .into_iter()
            .filter_map(|entry| to_raw_entry(entry, feed_title.as_deref()))
            .collect())
    }
}

/// Convert a parsed feed entry, discarding entries without title or link
///
/// Summary extraction prefers the summary/description element and falls
/// back to the first content block; markup is stripped to plain text and
/// image URLs are collected separately.
fn to_raw_entry(entry: feed_rs::model::Entry, feed_title: Option<&str>) -> Option<RawEntry> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .filter(|l| !l.is_empty())?;

    let raw_summary = entry
        .summary
        .map(|t| t.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    let (summary, images) = extract::clean_markup(&raw_summary);

    Some(RawEntry {
        title,
        summary,
        link,
        published: entry.published.or(entry.updated),
        source: entry.source.or_else(|| feed_title.map(String::from)),
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example Wire</title>
  <item>
    <title>First story</title>
    <link>https://news.example/1</link>
    <description>&lt;p&gt;Lead paragraph &lt;img src="https://img.example/a.png"/&gt;&lt;/p&gt;</description>
    <pubDate>Mon, 05 Aug 2024 10:00:00 GMT</pubDate>
  </item>
  <item>
    <link>https://news.example/no-title</link>
    <description>Discarded, no title</description>
  </item>
  <item>
    <title>Third story</title>
    <link>https://news.example/3</link>
  </item>
</channel></rss>"#;

    fn parse_sample() -> Vec<RawEntry> {
        let feed = feed_rs::parser::parse(RSS_SAMPLE.as_bytes()).unwrap();
        let feed_title = feed.title.map(|t| t.content);
        feed.entries
            .into_iter()
            .filter_map(|e| to_raw_entry(e, feed_title.as_deref()))
            .collect()
    }

    #[test]
    fn test_entry_extraction() {
        let entries = parse_sample();
        assert_eq!(entries.len(), 2, "entry without title is discarded");

        let first = &entries[0];
        assert_eq!(first.title, "First story");
        assert_eq!(first.link, "https://news.example/1");
        assert_eq!(first.summary, "Lead paragraph");
        assert_eq!(first.images, vec!["https://img.example/a.png"]);
        assert!(first.published.is_some());
        assert_eq!(first.source.as_deref(), Some("Example Wire"));
    }

    #[test]
    fn test_entry_without_summary() {
        let entries = parse_sample();
        let third = &entries[1];
        assert_eq!(third.title, "Third story");
        assert!(third.summary.is_empty());
        assert!(third.published.is_none());
    }

    #[test]
    fn test_fetch_error_recoverability() {
        assert!(FetchError::Timeout.is_recoverable());
        assert!(FetchError::ServerError(503).is_recoverable());
        assert!(!FetchError::ServerError(404).is_recoverable());
        assert!(FetchError::Parse("bad xml".into()).is_recoverable());
    }
}

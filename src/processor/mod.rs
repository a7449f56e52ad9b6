//! Entry processing: translation and message assembly
//!
//! Turns a raw feed entry into an outbound message: title and summary are
//! translated into the tenant language, the summary is truncated to the
//! delivery body limit, the source gets a localized display name, and the
//! published time is rendered or replaced with a placeholder.

pub mod sources;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::delivery::OutboundMessage;
use crate::fetcher::RawEntry;
use crate::translate::{TranslationError, TranslationService};

/// Maximum body length in characters
pub const BODY_LIMIT: usize = 1024;

/// Placeholder when a feed entry carries no usable date
pub const NO_DATE: &str = "No date";

/// Truncate to [`BODY_LIMIT`] characters, ellipsis included in the limit
pub fn truncate_body(text: &str) -> String {
    if text.chars().count() <= BODY_LIMIT {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(BODY_LIMIT - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Render a published timestamp, always in UTC
pub fn format_timestamp(published: Option<DateTime<Utc>>) -> String {
    match published {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => NO_DATE.to_string(),
    }
}

/// Builds outbound messages from raw entries
pub struct EntryProcessor {
    translator: Arc<TranslationService>,
}

impl EntryProcessor {
    pub fn new(translator: Arc<TranslationService>) -> Self {
        Self { translator }
    }

    /// Translate and format one entry for delivery
    ///
    /// # Errors
    ///
    /// Returns the translation error when both providers stay down; the
    /// caller drops the entry and leaves it out of the ledger so the next
    /// cycle retries it.
    pub async fn process(
        &self,
        entry: &RawEntry,
        language: &str,
    ) -> Result<OutboundMessage, TranslationError> {
        let title = self.translator.translate(&entry.title, language).await?;
        let summary = self.translator.translate(&entry.summary, language).await?;

        Ok(OutboundMessage {
            title,
            link: entry.link.clone(),
            body: truncate_body(&summary),
            source: sources::source_label(&entry.link, entry.source.as_deref(), language),
            timestamp: format_timestamp(entry.published),
            image: entry.images.first().cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslationProvider;
    use crate::utils::retry::RetryConfig;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct EchoProvider;

    #[async_trait]
    impl TranslationProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn translate(&self, text: &str, target: &str) -> Result<String, TranslationError> {
            Ok(format!("{target}:{text}"))
        }
    }

    fn echo_processor() -> EntryProcessor {
        let service = TranslationService::new(Box::new(EchoProvider), Box::new(EchoProvider))
            .with_retry(RetryConfig::fixed(0, 1));
        EntryProcessor::new(Arc::new(service))
    }

    fn entry() -> RawEntry {
        RawEntry {
            title: "Breaking".into(),
            summary: "Something happened".into(),
            link: "https://www.ft.com/content/abc".into(),
            published: Some(Utc.with_ymd_and_hms(2024, 8, 5, 9, 30, 0).unwrap()),
            source: None,
            images: vec!["https://img.example/a.png".into()],
        }
    }

    #[test]
    fn test_truncate_within_limit() {
        let text = "a".repeat(1024);
        assert_eq!(truncate_body(&text), text);
    }

    #[test]
    fn test_truncate_over_limit() {
        let text = "a".repeat(1200);
        let truncated = truncate_body(&text);
        assert_eq!(truncated.chars().count(), 1024);
        assert!(truncated.ends_with("..."));
        assert_eq!(&truncated[..1021], &text[..1021]);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        // 1100 multibyte characters must still collapse to 1024 chars
        let text = "漢".repeat(1100);
        let truncated = truncate_body(&text);
        assert_eq!(truncated.chars().count(), 1024);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 8, 5, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(Some(ts)), "2024-08-05 09:30:00 UTC");
        assert_eq!(format_timestamp(None), "No date");
    }

    #[tokio::test]
    async fn test_process_builds_message() {
        let message = echo_processor().process(&entry(), "zh").await.unwrap();

        assert_eq!(message.title, "zh:Breaking");
        assert_eq!(message.body, "zh:Something happened");
        assert_eq!(message.link, "https://www.ft.com/content/abc");
        assert_eq!(message.source, "金融时报");
        assert_eq!(message.timestamp, "2024-08-05 09:30:00 UTC");
        assert_eq!(message.image.as_deref(), Some("https://img.example/a.png"));
    }

    #[tokio::test]
    async fn test_process_non_chinese_target_gets_english_source() {
        let message = echo_processor().process(&entry(), "fr").await.unwrap();
        assert_eq!(message.source, "Financial Times");
    }
}

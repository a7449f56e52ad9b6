//! Outbound message delivery
//!
//! Delivery is abstracted behind [`MessageChannel`] so the pipeline never
//! knows which platform it is talking to. One webhook implementation
//! ships. A message that fails to deliver is dropped for the cycle and,
//! because only delivered links enter the ledger, picked up again on the
//! next one.

pub mod webhook;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

pub use webhook::WebhookChannel;

/// Errors from a delivery channel
#[derive(Error, Debug)]
pub enum ChannelError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Delivery endpoint returned a server error
    #[error("delivery endpoint returned status {0}")]
    ServerError(u16),
}

impl ChannelError {
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Outcome of a single send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Accepted by the endpoint
    Delivered,

    /// Rejected with a client error; retrying the same payload is pointless
    Rejected(u16),
}

/// A fully formatted message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Translated headline
    pub title: String,

    /// Entry link
    pub link: String,

    /// Translated summary, truncated to the body limit
    pub body: String,

    /// Localized source display name
    pub source: String,

    /// Rendered publish time, or the no-date placeholder
    pub timestamp: String,

    /// First extracted image URL, if any
    pub image: Option<String>,
}

impl OutboundMessage {
    /// Render the message as markdown with a fixed-width body block
    pub fn render(&self) -> String {
        format!(
            "[{}]({})\n```fix\n{}\n\nSource: {}\nTime: {}\n```",
            self.title, self.link, self.body, self.source, self.timestamp
        )
    }

    /// JSON payload for the delivery API
    pub fn to_payload(&self) -> Value {
        match &self.image {
            Some(url) => json!({
                "content": self.render(),
                "embeds": [{"image": {"url": url}}],
            }),
            None => json!({"content": self.render()}),
        }
    }
}

/// A destination for outbound messages
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Channel name for logging
    fn name(&self) -> &'static str;

    /// Send one message to a tenant's channel
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` on transport failures and server errors;
    /// client-error rejections come back as `Ok(DeliveryStatus::Rejected)`.
    async fn send(
        &self,
        channel: &str,
        message: &OutboundMessage,
    ) -> Result<DeliveryStatus, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage {
            title: "标题".into(),
            link: "https://news.example/1".into(),
            body: "摘要正文".into(),
            source: "路透社".into(),
            timestamp: "2024-08-05 09:30:00 UTC".into(),
            image: None,
        }
    }

    #[test]
    fn test_render_shape() {
        let rendered = message().render();
        assert!(rendered.starts_with("[标题](https://news.example/1)\n```fix\n"));
        assert!(rendered.contains("Source: 路透社"));
        assert!(rendered.contains("Time: 2024-08-05 09:30:00 UTC"));
        assert!(rendered.ends_with("```"));
    }

    #[test]
    fn test_payload_without_image() {
        let payload = message().to_payload();
        assert!(payload.get("content").is_some());
        assert!(payload.get("embeds").is_none());
    }

    #[test]
    fn test_payload_with_image() {
        let mut msg = message();
        msg.image = Some("https://img.example/a.png".into());
        let payload = msg.to_payload();
        assert_eq!(
            payload["embeds"][0]["image"]["url"],
            "https://img.example/a.png"
        );
    }
}

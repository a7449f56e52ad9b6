//! Webhook delivery channel
//!
//! Posts message payloads to `{api_base}/channels/{channel}/messages`
//! with a bearer token. Sends are single-shot: a dropped message simply
//! comes around again next cycle because it never entered the ledger.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChannelError, DeliveryStatus, MessageChannel, OutboundMessage};
use crate::config::Config;

pub struct WebhookChannel {
    client: Client,
    api_base: String,
    access_token: String,
}

impl WebhookChannel {
    /// # Errors
    ///
    /// Returns `ChannelError::Http` if the HTTP client cannot be created
    pub fn new(
        api_base: &str,
        access_token: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        Self::new(
            &config.api_base,
            &config.access_token,
            config.request_timeout(),
            &config.http.user_agent,
        )
    }
}

#[async_trait]
impl MessageChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(
        &self,
        channel: &str,
        message: &OutboundMessage,
    ) -> Result<DeliveryStatus, ChannelError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&message.to_payload())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(channel = %channel, link = %message.link, "Message delivered");
            return Ok(DeliveryStatus::Delivered);
        }

        if status.is_client_error() {
            warn!(
                channel = %channel,
                link = %message.link,
                status = status.as_u16(),
                "Delivery rejected, dropping message"
            );
            return Ok(DeliveryStatus::Rejected(status.as_u16()));
        }

        Err(ChannelError::ServerError(status.as_u16()))
    }
}

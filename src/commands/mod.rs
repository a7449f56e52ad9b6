//! Tenant configuration commands
//!
//! The chat-facing surface calls into this handler; every command maps
//! 1:1 onto a store mutation and returns the reply text to show the
//! user. Touching a tenant also makes sure its scheduler job exists, so
//! a freshly configured tenant starts cycling without a restart.

use std::sync::Arc;

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::tenant::{TenantStore, SUPPORTED_LANGUAGES};

pub struct CommandHandler {
    store: Arc<TenantStore>,
    scheduler: Arc<Scheduler>,
}

impl CommandHandler {
    pub fn new(store: Arc<TenantStore>, scheduler: Arc<Scheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Add a feed URL to the tenant's list
    pub async fn add_feed(&self, tenant: u64, url: &str) -> Result<String> {
        self.scheduler.ensure_job(tenant).await;

        if self.store.add_feed(tenant, url).await? {
            Ok(format!("Added feed: {url}"))
        } else {
            Ok("Feed is already configured or the URL is invalid.".to_string())
        }
    }

    /// Remove a feed URL from the tenant's list
    pub async fn remove_feed(&self, tenant: u64, url: &str) -> Result<String> {
        self.scheduler.ensure_job(tenant).await;

        if self.store.remove_feed(tenant, url).await? {
            Ok(format!("Removed feed: {url}"))
        } else {
            Ok("That feed is not configured.".to_string())
        }
    }

    /// Show the tenant's feed list
    pub async fn list_feeds(&self, tenant: u64) -> Result<String> {
        let record = self.store.get(tenant).await;
        if record.feeds.is_empty() {
            return Ok("No RSS feeds.".to_string());
        }

        let lines: Vec<String> = record
            .feeds
            .iter()
            .enumerate()
            .map(|(i, url)| format!("{}. {url}", i + 1))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Point deliveries at a channel
    pub async fn set_channel(&self, tenant: u64, channel: &str) -> Result<String> {
        self.scheduler.ensure_job(tenant).await;
        self.store.set_channel(tenant, channel).await?;
        Ok("Feed updates will be delivered to this channel.".to_string())
    }

    /// Change the target language
    pub async fn set_language(&self, tenant: u64, language: &str) -> Result<String> {
        self.scheduler.ensure_job(tenant).await;

        if self.store.set_language(tenant, language).await? {
            Ok(format!("Target language set to {language}."))
        } else {
            Ok(format!(
                "Unsupported language '{language}'. Supported: {}.",
                SUPPORTED_LANGUAGES.join(", ")
            ))
        }
    }

    /// Change the cycle interval, retuning the running job immediately
    pub async fn set_interval(&self, tenant: u64, minutes: u32) -> Result<String> {
        self.scheduler.ensure_job(tenant).await;

        if self.store.set_interval(tenant, minutes).await? {
            self.scheduler.retune(tenant, minutes).await;
            Ok(format!("Update interval set to {minutes} minutes."))
        } else {
            Ok("The interval must be a positive number of minutes.".to_string())
        }
    }
}

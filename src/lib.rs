//! babelfeed - Multi-tenant RSS/Atom translation relay
//!
//! Ingests RSS/Atom feeds per tenant, translates new entries into the
//! tenant's language, deduplicates against a time-boxed ledger, and
//! delivers formatted messages to the tenant's output channel on a
//! per-tenant schedule.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Startup configuration from environment variables
//! - [`tenant`] - Persisted per-tenant records and the tenant store
//! - [`fetcher`] - Concurrent feed retrieval and entry extraction
//! - [`translate`] - Translation providers with primary/secondary failover
//! - [`processor`] - Per-entry translation, source mapping, and truncation
//! - [`delivery`] - Output channel trait and webhook implementation
//! - [`scheduler`] - One retunable periodic job per tenant
//! - [`dispatcher`] - Orchestration of a single tenant cycle
//! - [`commands`] - Config mutations consumed by the chat-command surface
//!
//! # Example
//!
//! ```no_run
//! use babelfeed::config::Config;
//! use babelfeed::tenant::TenantStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = TenantStore::load(&config.data_dir).await?;
//!     println!("loaded {} tenants", store.tenant_ids().await.len());
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod processor;
pub mod scheduler;
pub mod tenant;
pub mod translate;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::delivery::{DeliveryStatus, MessageChannel, OutboundMessage};
    pub use crate::dispatcher::{CycleReport, Dispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::fetcher::{FeedFetcher, RawEntry};
    pub use crate::scheduler::Scheduler;
    pub use crate::tenant::{TenantRecord, TenantStore};
    pub use crate::translate::TranslationService;
}

//! Tenant cycle execution
//!
//! A cycle is the unit of work the scheduler fires per tenant: prune the
//! ledger, fetch all feeds, translate and format new entries, deliver
//! them, then record what was delivered. Per-item failures are dropped
//! and logged; only a store failure aborts the cycle.
//!
//! A per-tenant in-flight flag makes cycles non-overlapping: a tick that
//! lands while the previous cycle is still running is skipped outright
//! rather than queued.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::delivery::{DeliveryStatus, MessageChannel};
use crate::error::Result;
use crate::fetcher::FeedFetcher;
use crate::processor::EntryProcessor;
use crate::tenant::TenantStore;

/// Outcome counts for one completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub tenant: u64,
    /// Entries fetched across all feeds
    pub fetched: usize,
    /// Entries skipped because the ledger already had them
    pub skipped: usize,
    /// Messages accepted by the channel
    pub delivered: usize,
    /// Entries lost to translation or delivery failures
    pub failed: usize,
}

impl CycleReport {
    fn empty(tenant: u64) -> Self {
        Self {
            tenant,
            fetched: 0,
            skipped: 0,
            delivered: 0,
            failed: 0,
        }
    }
}

/// Clears the in-flight flag even when the cycle errors out
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Anything the scheduler can fire a cycle on
#[async_trait::async_trait]
pub trait CycleRunner: Send + Sync {
    /// Run one cycle; `Ok(None)` means the tick was skipped
    async fn run_cycle(&self, tenant: u64) -> Result<Option<CycleReport>>;
}

#[async_trait::async_trait]
impl CycleRunner for Dispatcher {
    async fn run_cycle(&self, tenant: u64) -> Result<Option<CycleReport>> {
        Dispatcher::run_cycle(self, tenant).await
    }
}

/// Runs tenant cycles over the shared pipeline components
pub struct Dispatcher {
    store: Arc<TenantStore>,
    fetcher: Arc<FeedFetcher>,
    processor: Arc<EntryProcessor>,
    channel: Arc<dyn MessageChannel>,
    in_flight: Mutex<HashMap<u64, Arc<AtomicBool>>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<TenantStore>,
        fetcher: Arc<FeedFetcher>,
        processor: Arc<EntryProcessor>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        Self {
            store,
            fetcher,
            processor,
            channel,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn flight_flag(&self, tenant: u64) -> Arc<AtomicBool> {
        let mut flags = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            flags
                .entry(tenant)
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Run one cycle for a tenant
    ///
    /// Returns `Ok(None)` when the previous cycle for this tenant is
    /// still in flight.
    ///
    /// # Errors
    ///
    /// Returns a store error when tenant state cannot be read or
    /// persisted; the cycle is abandoned and nothing is recorded.
    pub async fn run_cycle(&self, tenant: u64) -> Result<Option<CycleReport>> {
        let flag = self.flight_flag(tenant);
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(tenant = tenant, "Previous cycle still running, skipping tick");
            return Ok(None);
        }
        let _guard = FlightGuard(flag);

        self.cycle_inner(tenant).await.map(Some)
    }

    async fn cycle_inner(&self, tenant: u64) -> Result<CycleReport> {
        let snapshot = self.store.begin_cycle(tenant, Utc::now()).await?;

        let Some(channel_id) = snapshot.channel else {
            debug!(tenant = tenant, "No output channel configured, skipping cycle");
            return Ok(CycleReport::empty(tenant));
        };

        if snapshot.feeds.is_empty() {
            debug!(tenant = tenant, "No feeds configured, skipping cycle");
            return Ok(CycleReport::empty(tenant));
        }

        let entries = self.fetcher.fetch_all(&snapshot.feeds).await;

        let mut report = CycleReport::empty(tenant);
        report.fetched = entries.len();

        // Ledger links plus links delivered earlier in this same cycle,
        // so the same story carried by two feeds goes out once.
        let mut seen = snapshot.seen_links;
        let mut delivered_links = Vec::new();

        for entry in entries {
            if seen.contains(&entry.link) {
                report.skipped += 1;
                continue;
            }

            let message = match self.processor.process(&entry, &snapshot.language).await {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        tenant = tenant,
                        link = %entry.link,
                        error = %e,
                        "Translation failed, entry retries next cycle"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match self.channel.send(&channel_id, &message).await {
                Ok(DeliveryStatus::Delivered) => {
                    seen.insert(entry.link.clone());
                    delivered_links.push(entry.link);
                }
                Ok(DeliveryStatus::Rejected(_)) => {
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(
                        tenant = tenant,
                        link = %entry.link,
                        error = %e,
                        "Delivery failed, entry retries next cycle"
                    );
                    report.failed += 1;
                }
            }
        }

        report.delivered = delivered_links.len();
        self.store
            .record_deliveries(tenant, delivered_links, Utc::now())
            .await?;

        info!(
            tenant = tenant,
            fetched = report.fetched,
            skipped = report.skipped,
            delivered = report.delivered,
            failed = report.failed,
            "Cycle complete"
        );

        Ok(report)
    }
}

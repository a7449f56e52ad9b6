//! Per-tenant periodic scheduling
//!
//! Each tenant gets its own job task ticking at that tenant's interval.
//! Interval changes land through a watch channel and take effect
//! immediately: the old cadence is dropped and the next cycle fires one
//! new interval from the change. Shutdown is broadcast; jobs finish any
//! in-flight cycle before exiting, so state is persisted and no delivery
//! is cut off mid-send.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::dispatcher::CycleRunner;
use crate::tenant::TenantStore;

/// Running job for one tenant
struct JobHandle {
    interval_tx: watch::Sender<Duration>,
    task: JoinHandle<()>,
}

/// Owns one periodic job per tenant
pub struct Scheduler {
    store: Arc<TenantStore>,
    runner: Arc<dyn CycleRunner>,
    jobs: Mutex<HashMap<u64, JobHandle>>,
    shutdown: broadcast::Sender<()>,
}

fn period_for(interval_minutes: u32) -> Duration {
    Duration::from_secs(u64::from(interval_minutes) * 60)
}

impl Scheduler {
    pub fn new(store: Arc<TenantStore>, runner: Arc<dyn CycleRunner>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            store,
            runner,
            jobs: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Start a job for every tenant already in the store
    pub async fn start(&self) {
        let ids = self.store.tenant_ids().await;
        info!(tenants = ids.len(), "Starting scheduler");
        for id in ids {
            self.ensure_job(id).await;
        }
    }

    /// Make sure a job exists for the tenant, spawning one if needed
    pub async fn ensure_job(&self, tenant: u64) {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&tenant) {
            return;
        }

        let period = period_for(self.store.get(tenant).await.interval_minutes);
        let (interval_tx, interval_rx) = watch::channel(period);
        let runner = Arc::clone(&self.runner);
        let shutdown = self.shutdown.subscribe();

        debug!(tenant = tenant, period_secs = period.as_secs(), "Spawning tenant job");
        let task = tokio::spawn(run_job(tenant, runner, interval_rx, shutdown));

        jobs.insert(tenant, JobHandle { interval_tx, task });
    }

    /// Apply a new interval to a tenant's job immediately
    ///
    /// The store must already hold the new value; this only retunes the
    /// running ticker (and spawns the job if the tenant had none).
    pub async fn retune(&self, tenant: u64, interval_minutes: u32) {
        self.ensure_job(tenant).await;

        let jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get(&tenant) {
            let period = period_for(interval_minutes);
            debug!(tenant = tenant, period_secs = period.as_secs(), "Retuning tenant job");
            // send_replace never fails while the job task holds the receiver
            job.interval_tx.send_replace(period);
        }
    }

    /// Stop all jobs, draining in-flight cycles
    pub async fn shutdown(&self) {
        info!("Stopping scheduler");
        let _ = self.shutdown.send(());

        let mut jobs = self.jobs.lock().await;
        for (tenant, job) in jobs.drain() {
            if let Err(e) = job.task.await {
                error!(tenant = tenant, error = %e, "Tenant job panicked");
            }
        }
    }
}

/// Job loop for one tenant
///
/// The first cycle fires right away; subsequent ones at the configured
/// interval. The cycle is awaited inside the loop, so a shutdown or
/// retune signal waits for an in-flight cycle to finish.
async fn run_job(
    tenant: u64,
    runner: Arc<dyn CycleRunner>,
    mut interval_rx: watch::Receiver<Duration>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(*interval_rx.borrow());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = runner.run_cycle(tenant).await {
                    error!(tenant = tenant, error = %e, "Cycle failed");
                }
            }
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                ticker = tokio::time::interval(*interval_rx.borrow());
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // Swallow the immediate first tick so the next cycle
                // fires one full interval from now
                ticker.tick().await;
            }
            _ = shutdown.recv() => {
                debug!(tenant = tenant, "Tenant job stopping");
                break;
            }
        }
    }
}

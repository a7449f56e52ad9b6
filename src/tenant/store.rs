//! File-backed tenant store with per-tenant exclusion
//!
//! All records are loaded at startup; a malformed file is skipped with a
//! logged error instead of aborting the load. Mutations are write-through:
//! validate, apply, mark dirty, persist. Persistence writes the full record
//! to a temp file and renames it into place so a crash never leaves a
//! partial record behind.
//!
//! Every tenant's state sits behind its own async mutex. Command-driven
//! mutations and that tenant's own cycle serialize through it, which is
//! what prevents lost updates between the two.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::{LedgerEntry, StoreError, TenantRecord};

/// In-memory slot for one tenant, guarded by a per-tenant mutex
struct TenantSlot {
    record: TenantRecord,
    dirty: bool,
}

/// Repository of tenant records keyed by tenant id
pub struct TenantStore {
    dir: PathBuf,
    slots: RwLock<HashMap<u64, Arc<Mutex<TenantSlot>>>>,
}

/// Read-only view of a tenant taken at the start of a cycle
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    pub channel: Option<String>,
    pub language: String,
    pub feeds: Vec<String>,
    pub seen_links: HashSet<String>,
}

impl TenantStore {
    /// Load all persisted records from `dir`, creating it if needed
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        let mut slots = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::load_record(&path).await {
                Ok(record) => {
                    debug!(tenant = record.id, path = %path.display(), "Loaded tenant record");
                    slots.insert(
                        record.id,
                        Arc::new(Mutex::new(TenantSlot {
                            record,
                            dirty: false,
                        })),
                    );
                }
                Err(e) => {
                    // A bad record must not abort the load; the tenant
                    // reverts to defaults on next access.
                    error!(path = %path.display(), error = %e, "Skipping malformed tenant record");
                }
            }
        }

        info!(dir = %dir.display(), tenants = slots.len(), "Tenant store loaded");

        Ok(Self {
            dir,
            slots: RwLock::new(slots),
        })
    }

    async fn load_record(path: &Path) -> Result<TenantRecord, StoreError> {
        let display = path.display().to_string();

        let stem_id: u64 = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::MalformedRecord {
                path: display.clone(),
                reason: "file name is not a tenant id".to_string(),
            })?;

        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::io(display.clone(), e))?;

        let record: TenantRecord =
            serde_json::from_str(&json).map_err(|e| StoreError::MalformedRecord {
                path: display.clone(),
                reason: e.to_string(),
            })?;

        if record.id != stem_id {
            return Err(StoreError::MalformedRecord {
                path: display.clone(),
                reason: format!("record id {} does not match file name", record.id),
            });
        }

        record
            .validate()
            .map_err(|reason| StoreError::MalformedRecord {
                path: display,
                reason,
            })?;

        Ok(record)
    }

    /// Get the slot for a tenant, lazily creating a default record
    ///
    /// Creation marks the record dirty; the file appears on the first
    /// write-through mutation or end-of-cycle persist.
    async fn slot(&self, id: u64) -> Arc<Mutex<TenantSlot>> {
        if let Some(slot) = self.slots.read().await.get(&id) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(id).or_insert_with(|| {
            info!(tenant = id, "Creating tenant record with defaults");
            Arc::new(Mutex::new(TenantSlot {
                record: TenantRecord::with_defaults(id),
                dirty: true,
            }))
        }))
    }

    /// Snapshot of a tenant record (lazily created if absent)
    pub async fn get(&self, id: u64) -> TenantRecord {
        let slot = self.slot(id).await;
        let guard = slot.lock().await;
        guard.record.clone()
    }

    /// Ids of all tenants currently known to the store
    pub async fn tenant_ids(&self) -> Vec<u64> {
        self.slots.read().await.keys().copied().collect()
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write the record atomically if it is dirty
    async fn persist_slot(&self, slot: &mut TenantSlot) -> Result<(), StoreError> {
        if !slot.dirty {
            return Ok(());
        }

        let path = self.record_path(slot.record.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&slot.record)?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(tmp.display().to_string(), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;

        slot.dirty = false;
        debug!(tenant = slot.record.id, path = %path.display(), "Persisted tenant record");
        Ok(())
    }

    /// Append a feed URL
    ///
    /// Returns `Ok(false)` without writing when the URL is invalid or
    /// already present.
    pub async fn add_feed(&self, id: u64, url: &str) -> Result<bool, StoreError> {
        if url::Url::parse(url).is_err() {
            return Ok(false);
        }

        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        if guard.record.feeds.iter().any(|f| f == url) {
            return Ok(false);
        }

        guard.record.feeds.push(url.to_string());
        guard.dirty = true;
        self.persist_slot(&mut guard).await?;
        Ok(true)
    }

    /// Remove a feed URL
    ///
    /// Returns `Ok(false)` without writing when the URL is not configured.
    pub async fn remove_feed(&self, id: u64, url: &str) -> Result<bool, StoreError> {
        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        let before = guard.record.feeds.len();
        guard.record.feeds.retain(|f| f != url);
        if guard.record.feeds.len() == before {
            return Ok(false);
        }

        guard.dirty = true;
        self.persist_slot(&mut guard).await?;
        Ok(true)
    }

    /// Set the output channel reference
    pub async fn set_channel(&self, id: u64, channel: &str) -> Result<bool, StoreError> {
        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        guard.record.channel = Some(channel.to_string());
        guard.dirty = true;
        self.persist_slot(&mut guard).await?;
        Ok(true)
    }

    /// Set the target language
    ///
    /// Returns `Ok(false)` without writing for an unsupported code.
    pub async fn set_language(&self, id: u64, language: &str) -> Result<bool, StoreError> {
        if !super::is_supported_language(language) {
            return Ok(false);
        }

        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        guard.record.language = language.to_string();
        guard.dirty = true;
        self.persist_slot(&mut guard).await?;
        Ok(true)
    }

    /// Set the cycle interval in minutes
    ///
    /// Returns `Ok(false)` without writing for a non-positive interval.
    pub async fn set_interval(&self, id: u64, minutes: u32) -> Result<bool, StoreError> {
        if minutes == 0 {
            return Ok(false);
        }

        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        guard.record.interval_minutes = minutes;
        guard.dirty = true;
        self.persist_slot(&mut guard).await?;
        Ok(true)
    }

    /// Start a cycle: prune stale ledger entries and take a snapshot
    ///
    /// The prune is persisted immediately so a crashed cycle cannot
    /// resurrect expired ledger entries.
    pub async fn begin_cycle(&self, id: u64, now: DateTime<Utc>) -> Result<CycleSnapshot, StoreError> {
        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;

        let removed = guard.record.prune_ledger(now);
        if removed > 0 {
            debug!(tenant = id, removed = removed, "Pruned dedup ledger");
            guard.dirty = true;
        }
        self.persist_slot(&mut guard).await?;

        Ok(CycleSnapshot {
            channel: guard.record.channel.clone(),
            language: guard.record.language.clone(),
            feeds: guard.record.feeds.clone(),
            seen_links: guard
                .record
                .ledger
                .iter()
                .map(|entry| entry.link.clone())
                .collect(),
        })
    }

    /// End a cycle: append delivered links to the ledger and persist once
    ///
    /// Re-reads the live record under the tenant lock, so config mutations
    /// that landed mid-cycle are preserved.
    pub async fn record_deliveries(
        &self,
        id: u64,
        links: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;

        for link in links {
            if !guard.record.ledger_contains(&link) {
                guard.record.ledger.push(LedgerEntry {
                    link,
                    first_seen: now,
                });
                guard.dirty = true;
            }
        }

        self.persist_slot(&mut guard).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::DEFAULT_FEEDS;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lazy_creation_with_defaults() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();

        let record = store.get(42).await;
        assert_eq!(record.id, 42);
        assert_eq!(record.feeds.len(), DEFAULT_FEEDS.len());

        // Creation alone does not write the file
        assert!(!dir.path().join("42.json").exists());
    }

    #[tokio::test]
    async fn test_add_feed_write_through() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();

        assert!(store.add_feed(1, "https://example.com/rss").await.unwrap());
        assert!(dir.path().join("1.json").exists());

        // Duplicate add is a no-op failure
        assert!(!store.add_feed(1, "https://example.com/rss").await.unwrap());

        // Invalid URL is rejected
        assert!(!store.add_feed(1, "not a url").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_feed() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();

        store.add_feed(1, "https://example.com/rss").await.unwrap();
        assert!(store.remove_feed(1, "https://example.com/rss").await.unwrap());
        assert!(!store.remove_feed(1, "https://example.com/rss").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_language_validation() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();

        assert!(store.set_language(1, "ja").await.unwrap());
        assert_eq!(store.get(1).await.language, "ja");
        assert!(!store.set_language(1, "klingon").await.unwrap());
        assert_eq!(store.get(1).await.language, "ja");
    }

    #[tokio::test]
    async fn test_set_interval_validation() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();

        assert!(store.set_interval(1, 5).await.unwrap());
        assert!(!store.set_interval(1, 0).await.unwrap());
        assert_eq!(store.get(1).await.interval_minutes, 5);
    }

    #[tokio::test]
    async fn test_reload_roundtrip() {
        let dir = tempdir().unwrap();
        {
            let store = TenantStore::load(dir.path()).await.unwrap();
            store.set_channel(9, "chan-123").await.unwrap();
            store.set_interval(9, 15).await.unwrap();
        }

        let store = TenantStore::load(dir.path()).await.unwrap();
        assert_eq!(store.tenant_ids().await, vec![9]);
        let record = store.get(9).await;
        assert_eq!(record.channel.as_deref(), Some("chan-123"));
        assert_eq!(record.interval_minutes, 15);
    }

    #[tokio::test]
    async fn test_malformed_record_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("7.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = TenantStore::load(dir.path()).await.unwrap();
        assert!(store.tenant_ids().await.is_empty());

        // The tenant reverts to defaults on next access
        let record = store.get(7).await;
        assert_eq!(record.language, "zh");
    }

    #[tokio::test]
    async fn test_begin_cycle_prunes_and_snapshots() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();
        let now = Utc::now();

        store.set_channel(3, "chan").await.unwrap();
        store
            .record_deliveries(
                3,
                vec!["https://a.example/1".into(), "https://b.example/2".into()],
                now - chrono::Duration::days(8),
            )
            .await
            .unwrap();

        let snapshot = store.begin_cycle(3, now).await.unwrap();
        assert!(snapshot.seen_links.is_empty());
        assert_eq!(snapshot.channel.as_deref(), Some("chan"));

        // Prune was persisted
        let reloaded = TenantStore::load(dir.path()).await.unwrap();
        assert!(reloaded.get(3).await.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_record_deliveries_appends_once() {
        let dir = tempdir().unwrap();
        let store = TenantStore::load(dir.path()).await.unwrap();
        let now = Utc::now();

        store
            .record_deliveries(4, vec!["https://x.example/a".into()], now)
            .await
            .unwrap();
        store
            .record_deliveries(4, vec!["https://x.example/a".into()], now)
            .await
            .unwrap();

        assert_eq!(store.get(4).await.ledger.len(), 1);
    }
}

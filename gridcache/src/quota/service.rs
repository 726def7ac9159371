//! Disk quota service.
//!
//! Owns every registered layer's [`LayerQuota`] and wires the scanner,
//! evictor and persisted records together:
//!
//! ```text
//! register_layer ──► persisted record? ── yes ──► seed usage, rebuild index
//!                                        └─ no ──► full cache scan
//!
//! run_monitor ──► every check interval:
//!                   evict over-quota layers (worker pool, one pass per layer)
//!                   persist records
//! ```
//!
//! The write path (`tile_stored`, `tile_accessed`, `tile_deleted`) never
//! waits on the worker pool.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::builder::{CacheInfoBuilder, ScanHandle, ScanReport, ScanTicket};
use super::error::QuotaError;
use super::eviction::{EvictionResult, Evictor};
use super::layer_quota::LayerQuota;
use super::persist::{QuotaRecord, QuotaStore};
use super::policy::ExpirationPolicy;
use super::pool::WorkerPool;
use super::tile_index::TileInfo;
use super::units::{round_to_block, Quota};
use crate::config::{DiskQuotaSettings, LayerSettings};
use crate::grid::GridSetBroker;
use crate::layer::{CachedLayer, TileLayer};
use crate::storage::{TileKey, TileStore};

/// Operator-facing view of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub layer: String,
    pub policy: ExpirationPolicy,
    pub used: Quota,
    pub limit: Option<Quota>,
    /// Tiles with eviction metadata.
    pub tiles: usize,
    pub scanning: bool,
}

impl LayerReport {
    pub fn is_over_quota(&self) -> bool {
        self.limit.is_some_and(|limit| self.used > limit)
    }
}

#[derive(Clone)]
struct RegisteredLayer {
    layer: Arc<dyn TileLayer>,
    quota: LayerQuota,
    evicting: Arc<AtomicBool>,
}

/// Clears a layer's eviction flag when the pass ends.
struct EvictionGuard {
    flag: Arc<AtomicBool>,
}

impl EvictionGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for EvictionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Disk quota enforcement for a tile cache.
pub struct DiskQuotaService {
    settings: DiskQuotaSettings,
    broker: Arc<GridSetBroker>,
    pool: WorkerPool,
    builder: CacheInfoBuilder,
    evictor: Arc<Evictor>,
    store: QuotaStore,
    /// Last loaded or saved record per layer.
    records: DashMap<String, QuotaRecord>,
    layers: DashMap<String, RegisteredLayer>,
    scans: DashMap<String, ScanHandle>,
    /// Layers whose last scan did not complete; their usage is not persisted.
    unsettled: DashSet<String>,
    shutdown: CancellationToken,
}

impl DiskQuotaService {
    /// Build the service and load persisted quota records.
    ///
    /// Must be called from within a Tokio runtime. `tiles` must store below
    /// `settings.cache_dir`.
    pub fn start(
        settings: DiskQuotaSettings,
        broker: Arc<GridSetBroker>,
        tiles: Arc<dyn TileStore>,
    ) -> Result<Self, QuotaError> {
        let shutdown = CancellationToken::new();
        let pool = WorkerPool::new(settings.max_concurrent_tasks);
        let builder = CacheInfoBuilder::new(
            &settings.cache_dir,
            settings.block_size,
            pool.clone(),
            shutdown.child_token(),
        );
        let evictor = Evictor::new(tiles).with_safety_margin(settings.safety_margin);
        let store = QuotaStore::new(settings.quota_file_path());
        let records: DashMap<String, QuotaRecord> = store.load()?.into_iter().collect();

        info!(
            cache_dir = %settings.cache_dir.display(),
            block_size = settings.block_size,
            max_concurrent_tasks = pool.capacity(),
            records = records.len(),
            "Disk quota service started"
        );

        Ok(Self {
            settings,
            broker,
            pool,
            builder,
            evictor: Arc::new(evictor),
            store,
            records,
            layers: DashMap::new(),
            scans: DashMap::new(),
            unsettled: DashSet::new(),
            shutdown,
        })
    }

    pub fn settings(&self) -> &DiskQuotaSettings {
        &self.settings
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Register a layer and start tracking its quota.
    ///
    /// A persisted record seeds the usage and only the eviction metadata is
    /// rebuilt from disk; without one the layer is fully scanned. Both run in
    /// the background.
    ///
    /// # Errors
    ///
    /// [`QuotaError::UnknownPolicy`] leaves the layer unregistered.
    /// [`QuotaError::AlreadyRegistered`] for a second registration.
    pub fn register_layer(
        &self,
        layer: Arc<dyn TileLayer>,
        settings: &LayerSettings,
    ) -> Result<LayerQuota, QuotaError> {
        let policy: ExpirationPolicy = settings.policy.parse()?;
        let limit = settings
            .quota
            .map(|bytes| Quota::from_bytes(u128::from(bytes)).nice());
        let name = layer.name().to_string();

        let seed = self.records.get(&name).map(|record| record.value().clone());
        let quota = match &seed {
            Some(record) => LayerQuota::with_usage(&name, policy, limit, record.used),
            None => LayerQuota::new(&name, policy, limit),
        };

        match self.layers.entry(name.clone()) {
            Entry::Occupied(_) => return Err(QuotaError::AlreadyRegistered(name)),
            Entry::Vacant(slot) => {
                slot.insert(RegisteredLayer {
                    layer: Arc::clone(&layer),
                    quota: quota.clone(),
                    evicting: Arc::new(AtomicBool::new(false)),
                });
            }
        }

        let ticket = match seed {
            Some(record) => {
                if record.policy != policy {
                    info!(
                        layer = %name,
                        previous = %record.policy,
                        policy = %policy,
                        "Expiration policy changed since last run"
                    );
                }
                info!(layer = %name, used = %record.used.nice(), "Layer usage seeded from record");
                self.builder.rebuild_index(layer.as_ref(), &quota)
            }
            None => self.builder.build_cache_info(layer.as_ref(), &quota),
        };
        self.track_scan(ticket);

        info!(
            layer = %name,
            policy = %policy,
            limit = %limit.map_or_else(|| "unlimited".to_string(), |l| l.to_string()),
            "Layer registered"
        );
        Ok(quota)
    }

    /// Register every configured layer, each covering its grid sets in full.
    pub fn register_configured(
        &self,
        layers: &[LayerSettings],
    ) -> Result<Vec<LayerQuota>, QuotaError> {
        layers
            .iter()
            .map(|settings| {
                let layer = CachedLayer::with_full_coverage(
                    settings.name.as_str(),
                    &self.broker,
                    settings.gridsets.as_slice(),
                )?;
                self.register_layer(Arc::new(layer), settings)
            })
            .collect()
    }

    /// Forget a layer's usage and metadata and scan it again.
    ///
    /// Returns `false` without touching anything if a scan of the layer is
    /// already running.
    pub fn rescan(&self, layer: &str) -> Result<bool, QuotaError> {
        let registered = self.registered(layer)?;
        let ticket = self
            .builder
            .rescan(registered.layer.as_ref(), &registered.quota)?;
        if !ticket.is_started() {
            debug!(layer = %layer, "Cache scan already running, rescan skipped");
        }
        Ok(self.track_scan(ticket))
    }

    /// Account a tile written to the cache. `size` is the file length.
    pub fn tile_stored(&self, layer: &str, key: TileKey, size: u64) -> Result<(), QuotaError> {
        let size = round_to_block(size, self.settings.block_size);
        self.registered(layer)?
            .quota
            .account_tile(key, SystemTime::now(), size)
    }

    /// Note a cache hit. Returns false if the tile is not tracked.
    pub fn tile_accessed(&self, layer: &str, key: &TileKey) -> Result<bool, QuotaError> {
        Ok(self.registered(layer)?.quota.record_access(key))
    }

    /// Account a tile removed from the cache.
    pub fn tile_deleted(&self, layer: &str, key: &TileKey) -> Result<Option<TileInfo>, QuotaError> {
        self.registered(layer)?.quota.release_tile(key)
    }

    pub fn layer_quota(&self, layer: &str) -> Option<LayerQuota> {
        self.layers.get(layer).map(|entry| entry.quota.clone())
    }

    /// Registered layer names, sorted.
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_scanning(&self, layer: &str) -> bool {
        self.builder.is_running(layer)
    }

    /// Snapshot of every registered layer, sorted by name.
    pub async fn report(&self) -> Result<Vec<LayerReport>, QuotaError> {
        let mut reports = Vec::new();
        for registered in self.registered_layers() {
            let quota = &registered.quota;
            reports.push(LayerReport {
                layer: quota.layer_name().to_string(),
                policy: quota.policy(),
                used: quota.settled_quota().await?,
                limit: quota.limit(),
                tiles: quota.index().len(),
                scanning: self.builder.is_running(quota.layer_name()),
            });
        }
        Ok(reports)
    }

    /// Wait for every scheduled scan and return their reports.
    pub async fn wait_for_scans(&self) -> Vec<ScanReport> {
        self.reap_scans(true).await
    }

    /// Run one eviction pass over every over-quota layer.
    ///
    /// Passes run concurrently on the worker pool. Layers being scanned or
    /// already evicting are skipped.
    pub async fn evict_over_quota(&self) -> Vec<EvictionResult> {
        let mut tasks = JoinSet::new();

        for registered in self.registered_layers() {
            let name = registered.quota.layer_name().to_string();
            if self.builder.is_running(&name) {
                debug!(layer = %name, "Cache scan in progress, deferring eviction");
                continue;
            }
            let used = match registered.quota.settled_quota().await {
                Ok(used) => used,
                Err(e) => {
                    warn!(layer = %name, error = %e, "Cannot read layer usage");
                    continue;
                }
            };
            if registered.quota.excess(&used).is_none() {
                continue;
            }
            let Some(guard) = EvictionGuard::try_acquire(&registered.evicting) else {
                debug!(layer = %name, "Eviction already running");
                continue;
            };

            let pool = self.pool.clone();
            let evictor = Arc::clone(&self.evictor);
            let quota = registered.quota.clone();
            tasks.spawn(async move {
                let _guard = guard;
                let _permit = pool.acquire().await?;
                evictor.evict_layer(&quota).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => warn!(error = %e, "Eviction pass failed"),
                Err(e) => warn!(error = %e, "Eviction task failed"),
            }
        }
        results.sort_by(|a, b| a.layer.cmp(&b.layer));
        results
    }

    /// Write quota records for every settled layer.
    ///
    /// Layers that are being scanned, or whose last scan did not complete,
    /// keep their previous record.
    pub async fn persist(&self) -> Result<(), QuotaError> {
        self.reap_scans(false).await;

        for registered in self.registered_layers() {
            let quota = &registered.quota;
            let name = quota.layer_name();
            if self.builder.is_running(name) || self.unsettled.contains(name) {
                continue;
            }
            let record = QuotaRecord {
                layer: name.to_string(),
                policy: quota.policy(),
                used: quota.settled_quota().await?,
                limit: quota.limit(),
            };
            self.records.insert(name.to_string(), record);
        }

        let records: BTreeMap<String, QuotaRecord> = self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(records.values()))
            .await
            .map_err(|e| QuotaError::Io(std::io::Error::other(e)))?
    }

    /// Periodically evict over-quota layers and persist records until
    /// `shutdown` is cancelled. Records are persisted once more on exit.
    pub async fn run_monitor(&self, shutdown: CancellationToken) {
        let period = self.settings.check_interval();
        info!(check_interval_secs = period.as_secs(), "Disk quota monitor started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = self.shutdown.cancelled() => break,

                _ = interval.tick() => {
                    let results = self.evict_over_quota().await;
                    if !results.is_empty() {
                        let freed: u64 = results.iter().map(|r| r.bytes_freed).sum();
                        debug!(layers = results.len(), freed, "Quota check evicted tiles");
                    }
                    if let Err(e) = self.persist().await {
                        warn!(error = %e, "Failed to persist quota records");
                    }
                }
            }
        }

        if let Err(e) = self.persist().await {
            warn!(error = %e, "Failed to persist quota records on exit");
        }
        info!("Disk quota monitor stopped");
    }

    /// Cancel running scans, close the worker pool and persist records.
    pub async fn shutdown(&self) -> Result<(), QuotaError> {
        info!("Disk quota service shutting down");
        self.shutdown.cancel();
        self.reap_scans(true).await;
        self.pool.close();
        self.persist().await
    }

    fn registered(&self, layer: &str) -> Result<RegisteredLayer, QuotaError> {
        self.layers
            .get(layer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| QuotaError::UnknownLayer(layer.to_string()))
    }

    fn registered_layers(&self) -> Vec<RegisteredLayer> {
        let mut layers: Vec<RegisteredLayer> =
            self.layers.iter().map(|e| e.value().clone()).collect();
        layers.sort_by(|a, b| a.quota.layer_name().cmp(b.quota.layer_name()));
        layers
    }

    fn track_scan(&self, ticket: ScanTicket) -> bool {
        match ticket.into_handle() {
            Some(handle) => {
                self.scans.insert(handle.layer().to_string(), handle);
                true
            }
            None => false,
        }
    }

    /// Collect finished scans, or all of them when `wait` is set.
    async fn reap_scans(&self, wait: bool) -> Vec<ScanReport> {
        let layers: Vec<String> = self
            .scans
            .iter()
            .filter(|e| wait || e.value().is_finished())
            .map(|e| e.key().clone())
            .collect();

        let mut reports = Vec::new();
        for layer in layers {
            let Some((_, handle)) = self.scans.remove(&layer) else {
                continue;
            };
            let report = handle.wait().await;
            if report.is_completed() {
                self.unsettled.remove(&layer);
            } else {
                self.unsettled.insert(layer);
            }
            reports.push(report);
        }
        reports
    }
}

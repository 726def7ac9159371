//! Cache scanning.
//!
//! [`CacheInfoBuilder`] rebuilds a layer's quota state from what is already
//! on disk. Each scan runs in the background on the shared [`WorkerPool`]
//! and walks the layer directory:
//!
//! ```text
//! <root>/<layer>/<gridset>_<zz>[_<params>]/<bx>_<by>/<x>_<y>.<ext>
//!                └─ zoom dirs ────────────┘ └ buckets ┘ └ tiles ──┘
//! ```
//!
//! Only tiles whose grid set and zoom belong to one of the layer's grid
//! subsets, that fall inside the level coverage, and that sit exactly at
//! their canonical location are counted. Everything else is left alone.
//!
//! At most one scan runs per layer. The running flag is set when the scan is
//! scheduled and cleared by a drop guard when the scan task ends, whatever
//! the outcome.

use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::QuotaError;
use super::layer_quota::LayerQuota;
use super::pool::WorkerPool;
use super::units::round_to_block;
use crate::grid::{GridSubset, TileIndex};
use crate::layer::TileLayer;
use crate::storage::{
    parse_tile_file, parse_zoom_dir, FormatRegistry, TileKey, TilePathGenerator, ZoomDirectory,
};

/// Default filesystem block size in bytes.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    /// A directory could not be read or accounting failed.
    Aborted(String),
    Cancelled,
}

/// What a scan does with the tiles it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Register tiles and add their sizes to the layer usage.
    Full,
    /// Register tiles only. Used when the usage was seeded from a persisted
    /// record and only the eviction metadata is missing.
    IndexOnly,
}

/// Result of one layer scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub layer: String,
    /// Tiles accounted.
    pub tiles: u64,
    /// Bytes accounted, after block rounding.
    pub bytes: u64,
    /// Tiles or buckets skipped because of I/O errors.
    pub errors: u64,
    pub outcome: ScanOutcome,
}

impl ScanReport {
    fn new(layer: &str) -> Self {
        Self {
            layer: layer.to_string(),
            tiles: 0,
            bytes: 0,
            errors: 0,
            outcome: ScanOutcome::Completed,
        }
    }

    fn ended(layer: &str, outcome: ScanOutcome) -> Self {
        Self {
            outcome,
            ..Self::new(layer)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == ScanOutcome::Completed
    }
}

/// Completion signal of a scheduled scan.
#[derive(Debug)]
pub struct ScanHandle {
    layer: String,
    task: JoinHandle<ScanReport>,
}

impl ScanHandle {
    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the scan to finish.
    ///
    /// The layer's usage includes every accounted tile by the time this
    /// returns.
    pub async fn wait(self) -> ScanReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => ScanReport::ended(
                &self.layer,
                ScanOutcome::Aborted(format!("scan task failed: {}", e)),
            ),
        }
    }
}

/// Answer to [`CacheInfoBuilder::build_cache_info`].
#[derive(Debug)]
pub enum ScanTicket {
    Started(ScanHandle),
    /// A scan of the layer is already in flight; nothing was scheduled.
    AlreadyRunning,
}

impl ScanTicket {
    pub fn is_started(&self) -> bool {
        matches!(self, ScanTicket::Started(_))
    }

    pub fn into_handle(self) -> Option<ScanHandle> {
        match self {
            ScanTicket::Started(handle) => Some(handle),
            ScanTicket::AlreadyRunning => None,
        }
    }
}

/// Schedules background scans that seed layer quotas from disk.
#[derive(Debug)]
pub struct CacheInfoBuilder {
    paths: TilePathGenerator,
    formats: FormatRegistry,
    block_size: u64,
    pool: WorkerPool,
    shutdown: CancellationToken,
    running: Arc<DashMap<String, ()>>,
}

impl CacheInfoBuilder {
    /// Create a builder for the cache below `root`.
    ///
    /// Tile sizes are rounded up to `block_size`. Scans stop when `shutdown`
    /// is cancelled.
    pub fn new(
        root: impl Into<PathBuf>,
        block_size: u64,
        pool: WorkerPool,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            paths: TilePathGenerator::new(root),
            formats: FormatRegistry::new(),
            block_size,
            pool,
            shutdown,
            running: Arc::new(DashMap::new()),
        }
    }

    /// Use a custom format registry for recognizing tile extensions.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn paths(&self) -> &TilePathGenerator {
        &self.paths
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Schedule a scan of `layer`, accounting into `quota`.
    ///
    /// Returns immediately. If a scan of the same layer is still running the
    /// request is dropped and [`ScanTicket::AlreadyRunning`] is returned.
    pub fn build_cache_info(&self, layer: &dyn TileLayer, quota: &LayerQuota) -> ScanTicket {
        self.schedule(layer, quota, ScanMode::Full)
    }

    /// Schedule a scan that only rebuilds `quota`'s tile metadata, leaving
    /// its usage untouched.
    pub fn rebuild_index(&self, layer: &dyn TileLayer, quota: &LayerQuota) -> ScanTicket {
        self.schedule(layer, quota, ScanMode::IndexOnly)
    }

    /// Forget `quota`'s tiles and usage, then schedule a full scan.
    ///
    /// The reset only happens once the layer's scan slot is claimed, so a
    /// request that finds a scan running leaves the quota untouched and
    /// returns [`ScanTicket::AlreadyRunning`].
    pub fn rescan(
        &self,
        layer: &dyn TileLayer,
        quota: &LayerQuota,
    ) -> Result<ScanTicket, QuotaError> {
        let Some(guard) = self.claim(layer.name()) else {
            return Ok(ScanTicket::AlreadyRunning);
        };
        quota.reset()?;
        Ok(self.spawn_scan(guard, layer, quota, ScanMode::Full))
    }

    fn schedule(&self, layer: &dyn TileLayer, quota: &LayerQuota, mode: ScanMode) -> ScanTicket {
        match self.claim(layer.name()) {
            Some(guard) => self.spawn_scan(guard, layer, quota, mode),
            None => ScanTicket::AlreadyRunning,
        }
    }

    /// Set the layer's running flag, or `None` if it is already set.
    fn claim(&self, layer: &str) -> Option<RunningGuard> {
        match self.running.entry(layer.to_string()) {
            Entry::Occupied(_) => {
                debug!(layer = %layer, "Cache scan already running, ignoring request");
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(RunningGuard {
                    running: Arc::clone(&self.running),
                    layer: layer.to_string(),
                })
            }
        }
    }

    fn spawn_scan(
        &self,
        guard: RunningGuard,
        layer: &dyn TileLayer,
        quota: &LayerQuota,
        mode: ScanMode,
    ) -> ScanTicket {
        let name = layer.name().to_string();
        let scanner = LayerScanner {
            layer: name.clone(),
            paths: self.paths.clone(),
            formats: self.formats.clone(),
            block_size: self.block_size,
            subsets: layer.grid_subsets().to_vec(),
            quota: quota.clone(),
            cancel: self.shutdown.clone(),
            mode,
        };
        let pool = self.pool.clone();

        info!(layer = %name, mode = ?mode, "Cache scan scheduled");
        let task = tokio::spawn(async move {
            let _guard = guard;
            run_scan(scanner, pool).await
        });

        ScanTicket::Started(ScanHandle { layer: name, task })
    }

    /// Whether a scan of `layer` is scheduled or running.
    pub fn is_running(&self, layer: &str) -> bool {
        self.running.contains_key(layer)
    }

    /// Cancel every in-flight scan. Scans scheduled afterwards end
    /// immediately as cancelled.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }
}

/// Clears a layer's running flag when the scan task ends.
struct RunningGuard {
    running: Arc<DashMap<String, ()>>,
    layer: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.remove(&self.layer);
    }
}

async fn run_scan(scanner: LayerScanner, pool: WorkerPool) -> ScanReport {
    let layer = scanner.layer.clone();
    let quota = scanner.quota.clone();
    let cancel = scanner.cancel.clone();

    let _permit = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            debug!(layer = %layer, "Cache scan cancelled before start");
            return ScanReport::ended(&layer, ScanOutcome::Cancelled);
        }

        permit = pool.acquire() => match permit {
            Ok(permit) => permit,
            Err(e) => return ScanReport::ended(&layer, ScanOutcome::Aborted(e.to_string())),
        },
    };

    let started = Instant::now();
    let mut report = match tokio::task::spawn_blocking(move || scanner.run()).await {
        Ok(report) => report,
        Err(e) => ScanReport::ended(
            &layer,
            ScanOutcome::Aborted(format!("scan task failed: {}", e)),
        ),
    };

    // readers must see the full total once the running flag clears
    let used = match quota.settled_quota().await {
        Ok(used) => used,
        Err(e) => {
            report.outcome = ScanOutcome::Aborted(e.to_string());
            quota.used_quota()
        }
    };

    match &report.outcome {
        ScanOutcome::Completed => info!(
            layer = %layer,
            tiles = report.tiles,
            bytes = report.bytes,
            errors = report.errors,
            used = %used.nice(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache scan completed"
        ),
        ScanOutcome::Aborted(reason) => warn!(
            layer = %layer,
            tiles = report.tiles,
            reason = %reason,
            "Cache scan aborted"
        ),
        ScanOutcome::Cancelled => info!(
            layer = %layer,
            tiles = report.tiles,
            "Cache scan cancelled"
        ),
    }

    report
}

/// Blocking directory walk for one layer.
struct LayerScanner {
    layer: String,
    paths: TilePathGenerator,
    formats: FormatRegistry,
    block_size: u64,
    subsets: Vec<GridSubset>,
    quota: LayerQuota,
    cancel: CancellationToken,
    mode: ScanMode,
}

impl LayerScanner {
    fn run(&self) -> ScanReport {
        let mut report = ScanReport::new(&self.layer);
        let layer_dir = self.paths.layer_directory(&self.layer);

        let zoom_dirs = match fs::read_dir(&layer_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(layer = %self.layer, "No cached tiles for layer");
                return report;
            }
            Err(e) => {
                report.outcome = unreadable(&layer_dir, &e);
                return report;
            }
        };

        for entry in zoom_dirs {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(layer = %self.layer, error = %e, "Skipping unreadable zoom directory");
                    report.errors += 1;
                    continue;
                }
            };
            let Some(zoom) = entry.file_name().to_str().and_then(parse_zoom_dir) else {
                continue;
            };
            let Some(subset) = self
                .subsets
                .iter()
                .find(|s| s.name() == zoom.gridset_id && s.coverage(zoom.z).is_some())
            else {
                continue;
            };

            if let Err(outcome) = self.scan_zoom(&entry.path(), &zoom, subset, &mut report) {
                report.outcome = outcome;
                return report;
            }
        }

        report
    }

    fn scan_zoom(
        &self,
        dir: &Path,
        zoom: &ZoomDirectory,
        subset: &GridSubset,
        report: &mut ScanReport,
    ) -> Result<(), ScanOutcome> {
        let buckets = fs::read_dir(dir).map_err(|e| unreadable(dir, &e))?;

        for bucket in buckets {
            let bucket = match bucket {
                // stray files next to the buckets
                Ok(bucket) if bucket.file_type().is_ok_and(|t| t.is_file()) => continue,
                Ok(bucket) => bucket,
                Err(e) => {
                    warn!(layer = %self.layer, error = %e, "Skipping unreadable bucket");
                    report.errors += 1;
                    continue;
                }
            };
            let files = match fs::read_dir(bucket.path()) {
                Ok(files) => files,
                Err(e) => {
                    warn!(
                        layer = %self.layer,
                        path = %bucket.path().display(),
                        error = %e,
                        "Skipping unreadable bucket"
                    );
                    report.errors += 1;
                    continue;
                }
            };

            for file in files {
                if self.cancel.is_cancelled() {
                    return Err(ScanOutcome::Cancelled);
                }
                match file {
                    Ok(file) => self.scan_tile(&file, zoom, subset, report)?,
                    Err(e) => {
                        warn!(layer = %self.layer, error = %e, "Skipping unreadable tile");
                        report.errors += 1;
                    }
                }
            }
        }

        Ok(())
    }

    fn scan_tile(
        &self,
        entry: &DirEntry,
        zoom: &ZoomDirectory,
        subset: &GridSubset,
        report: &mut ScanReport,
    ) -> Result<(), ScanOutcome> {
        let path = entry.path();
        let Some(key) = entry
            .file_name()
            .to_str()
            .and_then(|name| self.tile_key(name, zoom, subset))
        else {
            return Ok(());
        };
        if self.paths.locate(&self.layer, &key).path() != path {
            debug!(path = %path.display(), "Ignoring tile outside the canonical layout");
            return Ok(());
        }

        // follows symlinks, a dangling one is an unreadable tile
        let metadata = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable tile");
                report.errors += 1;
                return Ok(());
            }
        };

        let size = round_to_block(metadata.len(), self.block_size);
        let metric = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        match self.mode {
            ScanMode::Full => self
                .quota
                .account_tile(key, metric, size)
                .map_err(|e| ScanOutcome::Aborted(e.to_string()))?,
            ScanMode::IndexOnly => self.quota.track_tile(key, metric, size),
        }

        report.tiles += 1;
        report.bytes = report.bytes.saturating_add(size);
        Ok(())
    }

    fn tile_key(&self, file_name: &str, zoom: &ZoomDirectory, subset: &GridSubset) -> Option<TileKey> {
        let (x, y, extension) = parse_tile_file(file_name)?;
        let format = self.formats.from_extension(extension).ok()?;
        let index = TileIndex::new(x, y, zoom.z);
        if !subset.covers(&index) {
            return None;
        }

        Some(TileKey {
            gridset_id: zoom.gridset_id.clone(),
            index,
            format,
            parameters_id: zoom.parameters_id,
        })
    }
}

fn unreadable(path: &Path, error: &io::Error) -> ScanOutcome {
    ScanOutcome::Aborted(format!("cannot read {}: {}", path.display(), error))
}

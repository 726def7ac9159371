//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// Disk quota service settings
    pub disk_quota: DiskQuotaSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// One entry per `[layer.NAME]` section, in file order
    pub layers: Vec<LayerSettings>,
}

impl ConfigFile {
    pub fn layer(&self, name: &str) -> Option<&LayerSettings> {
        self.layers.iter().find(|l| l.name == name)
    }
}

/// `[disk_quota]` section.
#[derive(Debug, Clone)]
pub struct DiskQuotaSettings {
    /// Root of the tile cache
    pub cache_dir: PathBuf,
    /// Filesystem block size tile sizes are rounded up to
    pub block_size: u64,
    /// Scan and eviction tasks allowed at once
    pub max_concurrent_tasks: usize,
    /// Seconds between quota checks
    pub check_interval_secs: u64,
    /// Fraction of the limit left free after eviction
    pub safety_margin: f64,
    /// Where quota records are persisted; `None` means `<cache_dir>/quota.ini`
    pub quota_file: Option<PathBuf>,
}

impl DiskQuotaSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn quota_file_path(&self) -> PathBuf {
        self.quota_file
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(super::defaults::DEFAULT_QUOTA_FILE))
    }
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log directory
    pub directory: PathBuf,
    /// Log file name within the directory
    pub file: String,
}

/// `[layer.NAME]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    pub name: String,
    /// Grid set names the layer is cached in
    pub gridsets: Vec<String>,
    /// Expiration policy name (LRU, LFU or FIFO)
    pub policy: String,
    /// Quota in bytes; `None` means unlimited
    pub quota: Option<u64>,
}

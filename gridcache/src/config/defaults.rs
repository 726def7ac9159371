//! Default values for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::grid::{WORLD_EPSG3857, WORLD_EPSG4326};
use crate::quota::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_CONCURRENT_TASKS, DEFAULT_SAFETY_MARGIN};

/// Seconds between quota checks.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Quota record file name, relative to the cache directory.
pub const DEFAULT_QUOTA_FILE: &str = "quota.ini";

/// Log file name.
pub const DEFAULT_LOG_FILE: &str = "gridcache.log";

/// Policy used when a layer section names none.
pub const DEFAULT_POLICY: &str = "LRU";

/// Default cache root: `<platform cache dir>/gridcache`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gridcache")
}

/// Grid sets a layer is cached in when its section names none.
pub fn default_layer_gridsets() -> Vec<String> {
    vec![WORLD_EPSG4326.to_string(), WORLD_EPSG3857.to_string()]
}

impl Default for DiskQuotaSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            block_size: DEFAULT_BLOCK_SIZE,
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            quota_file: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

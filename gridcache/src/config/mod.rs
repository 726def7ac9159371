//! Configuration for the gridcache service.
//!
//! Loaded from an INI file:
//!
//! ```ini
//! [disk_quota]
//! cache_dir = /var/cache/gridcache
//! block_size = 4096
//! max_concurrent_tasks = 4
//! check_interval_secs = 60
//! safety_margin = 0.1
//!
//! [layer.roads]
//! gridsets = EPSG:4326, EPSG:900913
//! policy = LRU
//! quota = 500MB
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;

pub use defaults::{
    default_cache_dir, default_layer_gridsets, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_LOG_FILE,
    DEFAULT_POLICY, DEFAULT_QUOTA_FILE,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use parser::LAYER_SECTION_PREFIX;
pub use settings::{ConfigFile, DiskQuotaSettings, LayerSettings, LoggingSettings};
pub use size::{format_size, parse_size, Size, SizeParseError};

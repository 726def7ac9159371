//! Disk quota accounting and enforcement.
//!
//! Each cached layer gets a [`LayerQuota`]: its expiration policy, optional
//! limit, tile metadata and used quota. [`CacheInfoBuilder`] seeds quotas
//! from the tiles already on disk, [`Evictor`] brings over-quota layers back
//! under their limit and [`DiskQuotaService`] ties both to the write path
//! and a periodic monitor.

mod builder;
mod error;
mod eviction;
mod layer_quota;
mod persist;
mod policy;
mod pool;
mod service;
mod tile_index;
mod units;
mod usage;

pub use builder::{
    CacheInfoBuilder, ScanHandle, ScanMode, ScanOutcome, ScanReport, ScanTicket,
    DEFAULT_BLOCK_SIZE,
};
pub use error::QuotaError;
pub use eviction::{EvictionResult, Evictor, DEFAULT_SAFETY_MARGIN};
pub use layer_quota::LayerQuota;
pub use persist::{QuotaRecord, QuotaStore};
pub use policy::ExpirationPolicy;
pub use pool::{WorkerPermit, WorkerPool, DEFAULT_MAX_CONCURRENT_TASKS};
pub use service::{DiskQuotaService, LayerReport};
pub use tile_index::{TileInfo, TileInfoIndex};
pub use units::{round_to_block, Quota, StorageUnit};
pub use usage::UsageHandle;

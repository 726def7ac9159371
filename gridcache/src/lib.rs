//! gridcache - grid sets and disk quotas for a map tile cache
//!
//! The library covers the storage side of a tile cache server:
//!
//! - [`grid`]: grid set construction from an extent, an SRS and either
//!   explicit resolutions or a level count, plus grid subsets.
//! - [`storage`]: deterministic on-disk tile addressing and a file-backed
//!   tile store.
//! - [`quota`]: per-layer usage accounting, cache scanning, expiration
//!   policies and eviction, tied together by [`quota::DiskQuotaService`].
//!
//! # Example
//!
//! ```
//! use gridcache::grid::{GridSetBroker, WORLD_EPSG4326};
//! use gridcache::storage::{TileFormat, TileKey, TilePathGenerator};
//! use gridcache::grid::TileIndex;
//!
//! let broker = GridSetBroker::new().unwrap();
//! let grid_set = broker.get(WORLD_EPSG4326).unwrap();
//! assert_eq!(grid_set.grid(0).unwrap().extent(), (2, 1));
//!
//! let paths = TilePathGenerator::new("/cache");
//! let key = TileKey::new(WORLD_EPSG4326, TileIndex::new(5, 2, 3), TileFormat::Png);
//! let location = paths.locate("topp:states", &key);
//! assert!(location.path().ends_with("05_02.png"));
//! ```

pub mod bbox;
pub mod config;
pub mod grid;
pub mod layer;
pub mod logging;
pub mod quota;
pub mod storage;

/// Version of the gridcache library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

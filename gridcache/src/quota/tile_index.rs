//! Per-layer tile metadata used by expiration policies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;

use crate::storage::TileKey;

/// What an expiration policy knows about one cached tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    pub key: TileKey,
    /// Size on disk, rounded up to the block size.
    pub size: u64,
    pub created: SystemTime,
    pub last_access: SystemTime,
    pub hits: u64,
}

impl TileInfo {
    pub fn new(key: TileKey, metric: SystemTime, size: u64) -> Self {
        Self {
            key,
            size,
            created: metric,
            last_access: metric,
            hits: 0,
        }
    }
}

/// Concurrent map of tile metadata for one layer.
#[derive(Debug, Default)]
pub struct TileInfoIndex {
    entries: DashMap<TileKey, TileInfo>,
    registrations: AtomicU64,
}

impl TileInfoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tile. Returns the replaced entry.
    pub fn register(&self, info: TileInfo) -> Option<TileInfo> {
        self.registrations.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(info.key.clone(), info)
    }

    /// Apply `update` to a tile's metadata. Returns false if it is unknown.
    pub fn update<F>(&self, key: &TileKey, update: F) -> bool
    where
        F: FnOnce(&mut TileInfo),
    {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                update(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &TileKey) -> Option<TileInfo> {
        self.entries.remove(key).map(|(_, info)| info)
    }

    pub fn get(&self, key: &TileKey) -> Option<TileInfo> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the sizes of every tracked tile.
    pub fn total_bytes(&self) -> u128 {
        self.entries
            .iter()
            .map(|entry| u128::from(entry.value().size))
            .sum()
    }

    /// Number of registrations since creation, replacements included.
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Copy of every entry, in no particular order.
    pub fn snapshot(&self) -> Vec<TileInfo> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Drop every entry. The registration counter is kept.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

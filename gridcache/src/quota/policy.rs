//! Expiration policies.
//!
//! A layer's policy is resolved once from its configured name. It decides
//! what metadata is kept per tile and in which order tiles are given up when
//! the layer exceeds its quota:
//!
//! | Policy | Access bumps   | Evicted first              |
//! |--------|----------------|----------------------------|
//! | LRU    | last access    | oldest access              |
//! | LFU    | hit count      | fewest hits, oldest access |
//! | FIFO   | nothing        | oldest creation            |

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use super::error::QuotaError;
use super::layer_quota::LayerQuota;
use super::tile_index::{TileInfo, TileInfoIndex};
use crate::storage::TileKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpirationPolicy {
    LeastRecentlyUsed,
    LeastFrequentlyUsed,
    FirstInFirstOut,
}

impl ExpirationPolicy {
    /// Short name used in configuration and quota records.
    pub fn name(self) -> &'static str {
        match self {
            ExpirationPolicy::LeastRecentlyUsed => "LRU",
            ExpirationPolicy::LeastFrequentlyUsed => "LFU",
            ExpirationPolicy::FirstInFirstOut => "FIFO",
        }
    }

    /// Register a tile with the layer's metadata index.
    ///
    /// `metric` is the tile's creation or last-modified time and seeds both
    /// its creation and access times. Returns the entry it replaced, if any.
    pub fn create_info_for(
        self,
        quota: &LayerQuota,
        key: TileKey,
        metric: SystemTime,
        size: u64,
    ) -> Option<TileInfo> {
        quota.index().register(TileInfo::new(key, metric, size))
    }

    /// Note a read of a cached tile. Returns false if the tile is untracked.
    pub fn record_access(self, quota: &LayerQuota, key: &TileKey, now: SystemTime) -> bool {
        match self {
            ExpirationPolicy::LeastRecentlyUsed => {
                quota.index().update(key, |info| info.last_access = now)
            }
            ExpirationPolicy::LeastFrequentlyUsed => quota.index().update(key, |info| {
                info.hits = info.hits.saturating_add(1);
                info.last_access = now;
            }),
            ExpirationPolicy::FirstInFirstOut => quota.index().contains(key),
        }
    }

    /// Tiles to delete, in eviction order, until at least `bytes_to_free`
    /// bytes would be released.
    pub fn select_victims(self, index: &TileInfoIndex, bytes_to_free: u128) -> Vec<TileInfo> {
        if bytes_to_free == 0 {
            return Vec::new();
        }

        let mut candidates = index.snapshot();
        match self {
            ExpirationPolicy::LeastRecentlyUsed => candidates
                .sort_unstable_by(|a, b| (a.last_access, &a.key).cmp(&(b.last_access, &b.key))),
            ExpirationPolicy::LeastFrequentlyUsed => candidates.sort_unstable_by(|a, b| {
                (a.hits, a.last_access, &a.key).cmp(&(b.hits, b.last_access, &b.key))
            }),
            ExpirationPolicy::FirstInFirstOut => candidates
                .sort_unstable_by(|a, b| (a.created, &a.key).cmp(&(b.created, &b.key))),
        }

        let mut freed = 0u128;
        let mut victims = Vec::new();
        for info in candidates {
            if freed >= bytes_to_free {
                break;
            }
            freed += u128::from(info.size);
            victims.push(info);
        }
        victims
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExpirationPolicy {
    type Err = QuotaError;

    /// Accepts `LRU`, `LFU`, `FIFO` or the spelled out names, ignoring case
    /// and separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "lru" | "leastrecentlyused" => Ok(ExpirationPolicy::LeastRecentlyUsed),
            "lfu" | "leastfrequentlyused" => Ok(ExpirationPolicy::LeastFrequentlyUsed),
            "fifo" | "firstinfirstout" => Ok(ExpirationPolicy::FirstInFirstOut),
            _ => Err(QuotaError::UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileIndex;
    use crate::storage::TileFormat;
    use std::time::Duration;

    fn key(x: u64) -> TileKey {
        TileKey::new("EPSG:4326", TileIndex::new(x, 0, 2), TileFormat::Png)
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn victim_keys(victims: &[TileInfo]) -> Vec<u64> {
        victims.iter().map(|info| info.key.index.x).collect()
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("LRU".parse::<ExpirationPolicy>().unwrap(), ExpirationPolicy::LeastRecentlyUsed);
        assert_eq!("lfu".parse::<ExpirationPolicy>().unwrap(), ExpirationPolicy::LeastFrequentlyUsed);
        assert_eq!(
            "First_In_First_Out".parse::<ExpirationPolicy>().unwrap(),
            ExpirationPolicy::FirstInFirstOut
        );
        assert!(matches!(
            "random".parse::<ExpirationPolicy>(),
            Err(QuotaError::UnknownPolicy(name)) if name == "random"
        ));
    }

    #[test]
    fn test_name_round_trips() {
        for policy in [
            ExpirationPolicy::LeastRecentlyUsed,
            ExpirationPolicy::LeastFrequentlyUsed,
            ExpirationPolicy::FirstInFirstOut,
        ] {
            assert_eq!(policy.name().parse::<ExpirationPolicy>().unwrap(), policy);
        }
    }

    #[tokio::test]
    async fn test_lru_evicts_oldest_access_first() {
        let policy = ExpirationPolicy::LeastRecentlyUsed;
        let quota = LayerQuota::new("roads", policy, None);
        for x in 0..3 {
            policy.create_info_for(&quota, key(x), at(100 + x), 10);
        }
        // tile 0 becomes the most recently used
        assert!(policy.record_access(&quota, &key(0), at(500)));

        let victims = policy.select_victims(quota.index(), 15);
        assert_eq!(victim_keys(&victims), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_lfu_evicts_fewest_hits_first() {
        let policy = ExpirationPolicy::LeastFrequentlyUsed;
        let quota = LayerQuota::new("roads", policy, None);
        for x in 0..3 {
            policy.create_info_for(&quota, key(x), at(100), 10);
        }
        policy.record_access(&quota, &key(0), at(200));
        policy.record_access(&quota, &key(0), at(201));
        policy.record_access(&quota, &key(2), at(300));

        let victims = policy.select_victims(quota.index(), 30);
        assert_eq!(victim_keys(&victims), vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_lfu_ties_break_on_oldest_access() {
        let policy = ExpirationPolicy::LeastFrequentlyUsed;
        let quota = LayerQuota::new("roads", policy, None);
        policy.create_info_for(&quota, key(0), at(300), 10);
        policy.create_info_for(&quota, key(1), at(100), 10);

        let victims = policy.select_victims(quota.index(), 10);
        assert_eq!(victim_keys(&victims), vec![1]);
    }

    #[tokio::test]
    async fn test_fifo_ignores_access() {
        let policy = ExpirationPolicy::FirstInFirstOut;
        let quota = LayerQuota::new("roads", policy, None);
        policy.create_info_for(&quota, key(0), at(100), 10);
        policy.create_info_for(&quota, key(1), at(200), 10);

        assert!(policy.record_access(&quota, &key(0), at(999)));
        assert_eq!(quota.index().get(&key(0)).unwrap().last_access, at(100));

        let victims = policy.select_victims(quota.index(), 1);
        assert_eq!(victim_keys(&victims), vec![0]);
    }

    #[tokio::test]
    async fn test_record_access_unknown_tile() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, None);
        assert!(!quota.policy().record_access(&quota, &key(9), at(1)));
    }

    #[tokio::test]
    async fn test_nothing_to_free_selects_nothing() {
        let policy = ExpirationPolicy::LeastRecentlyUsed;
        let quota = LayerQuota::new("roads", policy, None);
        policy.create_info_for(&quota, key(0), at(100), 10);

        assert!(policy.select_victims(quota.index(), 0).is_empty());
        assert_eq!(policy.select_victims(quota.index(), 1_000).len(), 1);
    }
}

//! Quota state of one layer.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::SystemTime;

use super::error::QuotaError;
use super::policy::ExpirationPolicy;
use super::tile_index::{TileInfo, TileInfoIndex};
use super::units::Quota;
use super::usage::UsageHandle;
use crate::storage::TileKey;

/// A layer's policy, limit, tile metadata and used quota.
///
/// Cheap to clone; the write path, scanner, evictor and reporting all share
/// the same state.
#[derive(Debug, Clone)]
pub struct LayerQuota {
    inner: Arc<LayerQuotaInner>,
}

#[derive(Debug)]
struct LayerQuotaInner {
    layer: String,
    policy: ExpirationPolicy,
    limit: Option<Quota>,
    index: TileInfoIndex,
    usage: UsageHandle,
    /// Held shared by tile updates and exclusively by [`LayerQuota::reset`],
    /// so an update lands entirely before or entirely after a reset.
    updates: RwLock<()>,
}

impl LayerQuota {
    /// Create an empty quota. Must be called from within a Tokio runtime.
    pub fn new(layer: impl Into<String>, policy: ExpirationPolicy, limit: Option<Quota>) -> Self {
        Self::with_usage(layer, policy, limit, Quota::ZERO)
    }

    /// Create a quota whose usage starts at `used`, e.g. from a persisted
    /// record.
    pub fn with_usage(
        layer: impl Into<String>,
        policy: ExpirationPolicy,
        limit: Option<Quota>,
        used: Quota,
    ) -> Self {
        let layer = layer.into();
        let usage = UsageHandle::spawn(&layer, used);
        Self {
            inner: Arc::new(LayerQuotaInner {
                layer,
                policy,
                limit,
                index: TileInfoIndex::new(),
                usage,
                updates: RwLock::new(()),
            }),
        }
    }

    pub fn layer_name(&self) -> &str {
        &self.inner.layer
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.inner.policy
    }

    pub fn limit(&self) -> Option<Quota> {
        self.inner.limit
    }

    pub fn index(&self) -> &TileInfoIndex {
        &self.inner.index
    }

    pub fn usage(&self) -> &UsageHandle {
        &self.inner.usage
    }

    /// Latest published usage.
    pub fn used_quota(&self) -> Quota {
        self.inner.usage.current()
    }

    /// Usage once every update sent so far has been applied.
    pub async fn settled_quota(&self) -> Result<Quota, QuotaError> {
        self.inner.usage.settled().await
    }

    /// Bytes above the limit for the given usage, `None` if within it or
    /// unlimited.
    pub fn excess(&self, used: &Quota) -> Option<u128> {
        let limit = self.inner.limit?;
        (used.bytes() > limit.bytes()).then(|| used.bytes() - limit.bytes())
    }

    /// Register a tile with the policy and add its size to the usage.
    ///
    /// If the key was already tracked, the old size is given back so a
    /// rewritten tile is only counted once. Performs no await, so a tile is
    /// either fully accounted or not at all.
    pub fn account_tile(
        &self,
        key: TileKey,
        metric: SystemTime,
        size: u64,
    ) -> Result<(), QuotaError> {
        let _update = self.update_guard();
        let previous = self.inner.policy.create_info_for(self, key, metric, size);
        self.inner.usage.add(size)?;
        if let Some(previous) = previous {
            self.inner.usage.subtract(previous.size)?;
        }
        Ok(())
    }

    /// Register a tile with the policy without touching the usage.
    pub fn track_tile(&self, key: TileKey, metric: SystemTime, size: u64) {
        let _update = self.update_guard();
        self.inner.policy.create_info_for(self, key, metric, size);
    }

    /// Note a read of a cached tile.
    pub fn record_access(&self, key: &TileKey) -> bool {
        self.inner
            .policy
            .record_access(self, key, SystemTime::now())
    }

    /// Stop tracking a tile and give back its size.
    pub fn release_tile(&self, key: &TileKey) -> Result<Option<TileInfo>, QuotaError> {
        let _update = self.update_guard();
        match self.inner.index.remove(key) {
            Some(info) => {
                self.inner.usage.subtract(info.size)?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    /// Forget every tile and zero the usage.
    ///
    /// Concurrent tile updates are held off until both are done, so the
    /// index and the usage never disagree about a tile.
    pub fn reset(&self) -> Result<(), QuotaError> {
        let _exclusive = self
            .inner
            .updates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.index.clear();
        self.inner.usage.reset()
    }

    fn update_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.inner
            .updates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileIndex;
    use crate::quota::StorageUnit;
    use crate::storage::TileFormat;

    fn key(x: u64) -> TileKey {
        TileKey::new("EPSG:4326", TileIndex::new(x, 0, 3), TileFormat::Png)
    }

    #[tokio::test]
    async fn test_account_tile_adds_size_and_registers() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, None);

        quota.account_tile(key(0), SystemTime::now(), 4096).unwrap();
        quota.account_tile(key(1), SystemTime::now(), 2048).unwrap();

        assert_eq!(quota.settled_quota().await.unwrap().bytes(), 6144);
        assert_eq!(quota.index().len(), 2);
        assert_eq!(quota.index().registrations(), 2);
    }

    #[tokio::test]
    async fn test_rewritten_tile_counted_once() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, None);

        quota.account_tile(key(0), SystemTime::now(), 4096).unwrap();
        quota.account_tile(key(0), SystemTime::now(), 8192).unwrap();

        assert_eq!(quota.settled_quota().await.unwrap().bytes(), 8192);
        assert_eq!(quota.index().len(), 1);
    }

    #[tokio::test]
    async fn test_track_tile_leaves_usage() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastFrequentlyUsed, None);

        quota.track_tile(key(0), SystemTime::now(), 4096);

        assert!(quota.index().contains(&key(0)));
        assert_eq!(quota.settled_quota().await.unwrap(), Quota::ZERO);
    }

    #[tokio::test]
    async fn test_release_tile() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::FirstInFirstOut, None);
        quota.account_tile(key(0), SystemTime::now(), 4096).unwrap();

        let released = quota.release_tile(&key(0)).unwrap().unwrap();
        assert_eq!(released.size, 4096);
        assert!(quota.release_tile(&key(0)).unwrap().is_none());
        assert_eq!(quota.settled_quota().await.unwrap(), Quota::ZERO);
    }

    #[tokio::test]
    async fn test_excess() {
        let limit = Quota::new(1, StorageUnit::KiB);
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, Some(limit));

        assert_eq!(quota.excess(&Quota::from_bytes(1000)), None);
        assert_eq!(quota.excess(&Quota::from_bytes(1024)), None);
        assert_eq!(quota.excess(&Quota::from_bytes(1100)), Some(76));

        let unlimited = LayerQuota::new("rivers", ExpirationPolicy::LeastRecentlyUsed, None);
        assert_eq!(unlimited.excess(&Quota::from_bytes(u128::MAX)), None);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let quota = LayerQuota::with_usage(
            "roads",
            ExpirationPolicy::LeastRecentlyUsed,
            None,
            Quota::from_bytes(10_000),
        );
        quota.account_tile(key(0), SystemTime::now(), 4096).unwrap();

        quota.reset().unwrap();

        assert_eq!(quota.settled_quota().await.unwrap(), Quota::ZERO);
        assert!(quota.index().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reset_during_updates_keeps_index_and_usage_in_step() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, None);

        std::thread::scope(|scope| {
            for writer in 0..4u64 {
                let quota = quota.clone();
                scope.spawn(move || {
                    for x in 0..500 {
                        quota
                            .account_tile(key(writer * 1000 + x), SystemTime::now(), 256)
                            .unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    quota.reset().unwrap();
                    std::thread::yield_now();
                }
            });
        });

        let used = quota.settled_quota().await.unwrap();
        assert_eq!(used.bytes(), quota.index().total_bytes());
        assert_eq!(used.bytes(), 256 * quota.index().len() as u128);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let quota = LayerQuota::new("roads", ExpirationPolicy::LeastRecentlyUsed, None);
        let clone = quota.clone();

        clone.account_tile(key(0), SystemTime::now(), 512).unwrap();

        assert_eq!(quota.settled_quota().await.unwrap().bytes(), 512);
        assert!(quota.index().contains(&key(0)));
    }
}

//! Quota enforcement.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::QuotaError;
use super::layer_quota::LayerQuota;
use super::units::Quota;
use crate::storage::{TileKey, TileStore};

/// Default fraction of the limit left free after an eviction pass.
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.1;

/// Outcome of one eviction pass over a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionResult {
    pub layer: String,
    pub files_deleted: u64,
    pub bytes_freed: u64,
    pub size_before: Quota,
    pub size_after: Quota,
}

/// Deletes tiles of over-quota layers in policy order.
///
/// A layer above its limit is brought down to `limit * (1 - safety_margin)`
/// so it does not hover right at the limit.
pub struct Evictor {
    store: Arc<dyn TileStore>,
    safety_margin: f64,
}

impl Evictor {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self {
            store,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }

    /// Sets the safety margin (0.0-1.0).
    pub fn with_safety_margin(mut self, margin: f64) -> Self {
        self.safety_margin = if margin.is_finite() {
            margin.clamp(0.0, 1.0)
        } else {
            DEFAULT_SAFETY_MARGIN
        };
        self
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// Usage an eviction pass aims for.
    pub fn target_bytes(&self, limit: &Quota) -> u128 {
        (limit.bytes() as f64 * (1.0 - self.safety_margin)) as u128
    }

    /// Evict tiles of `quota`'s layer until it is back under target.
    ///
    /// Does nothing for unlimited layers or layers within their limit.
    /// Tiles already gone from disk still have their accounting dropped;
    /// tiles that fail to delete are kept and logged.
    pub async fn evict_layer(&self, quota: &LayerQuota) -> Result<EvictionResult, QuotaError> {
        let size_before = quota.settled_quota().await?;
        let mut result = EvictionResult {
            layer: quota.layer_name().to_string(),
            files_deleted: 0,
            bytes_freed: 0,
            size_before,
            size_after: size_before,
        };

        let Some(limit) = quota.limit() else {
            return Ok(result);
        };
        if quota.excess(&size_before).is_none() {
            debug!(
                layer = %result.layer,
                used = %size_before.nice(),
                limit = %limit.nice(),
                "Layer within quota"
            );
            return Ok(result);
        }

        let target = self.target_bytes(&limit);
        let to_free = size_before.bytes().saturating_sub(target);
        let victims = quota.policy().select_victims(quota.index(), to_free);
        debug!(
            layer = %result.layer,
            policy = %quota.policy(),
            candidates = victims.len(),
            to_free = %to_free,
            "Eviction pass starting"
        );

        let store = Arc::clone(&self.store);
        let layer = result.layer.clone();
        let keys: Vec<TileKey> = victims.into_iter().map(|info| info.key).collect();
        let outcomes = tokio::task::spawn_blocking(move || {
            keys.into_iter()
                .map(|key| {
                    let outcome = store.delete(&layer, &key);
                    (key, outcome)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| QuotaError::Io(std::io::Error::other(e)))?;

        for (key, outcome) in outcomes {
            match outcome {
                Ok(deleted) => {
                    if let Some(info) = quota.release_tile(&key)? {
                        result.bytes_freed = result.bytes_freed.saturating_add(info.size);
                    }
                    if deleted.is_some() {
                        result.files_deleted += 1;
                    }
                }
                Err(e) => {
                    warn!(layer = %result.layer, tile = %key, error = %e, "Failed to evict tile");
                }
            }
        }

        result.size_after = quota.settled_quota().await?;
        info!(
            layer = %result.layer,
            files_deleted = result.files_deleted,
            freed = %Quota::from_bytes(u128::from(result.bytes_freed)).nice(),
            before = %result.size_before.nice(),
            after = %result.size_after.nice(),
            "Eviction pass completed"
        );

        Ok(result)
    }
}

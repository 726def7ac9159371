//! Disk quota errors.

use std::io;
use thiserror::Error;

use crate::grid::GridSetError;
use crate::storage::StorageError;

/// Errors raised by quota accounting, scanning and eviction.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// Expiration policy name not recognized
    #[error("Unknown expiration policy '{0}' (expected LRU, LFU or FIFO)")]
    UnknownPolicy(String),

    /// Quota string could not be parsed
    #[error("Invalid quota '{0}' - expected format like '500 MiB' or '2GiB'")]
    InvalidQuota(String),

    /// Grid set lookup or construction failed
    #[error(transparent)]
    Grid(#[from] GridSetError),

    /// Tile store failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O error outside the tile store
    #[error("Quota I/O error: {0}")]
    Io(#[from] io::Error),

    /// The task owning a layer's usage has stopped
    #[error("Usage owner for layer '{0}' is no longer running")]
    OwnerClosed(String),

    /// The worker pool was closed during shutdown
    #[error("Worker pool is closed")]
    PoolClosed,

    /// Quota records could not be read or written
    #[error("Quota persistence error: {0}")]
    Persistence(String),

    /// No quota is registered for the layer
    #[error("Layer '{0}' has no registered quota")]
    UnknownLayer(String),

    /// The layer already has a quota
    #[error("Layer '{0}' is already registered")]
    AlreadyRegistered(String),
}

//! Tile persistence.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use super::error::StorageError;
use super::key::TileKey;
use super::path::TilePathGenerator;

/// Where cached tiles are written, read and removed.
///
/// Implementations are synchronous; async callers run them on the blocking
/// pool.
pub trait TileStore: Send + Sync {
    /// Write a tile, replacing any previous content. Returns bytes written.
    fn put(&self, layer: &str, key: &TileKey, data: &[u8]) -> Result<u64, StorageError>;

    /// Read a tile. `Ok(None)` when it is not cached.
    fn get(&self, layer: &str, key: &TileKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove a tile. Returns the size of the removed file, `Ok(None)` when
    /// there was nothing to remove.
    fn delete(&self, layer: &str, key: &TileKey) -> Result<Option<u64>, StorageError>;
}

/// File-per-tile store using the shared tile addressing.
#[derive(Debug, Clone)]
pub struct FileTileStore {
    paths: TilePathGenerator,
}

impl FileTileStore {
    pub fn new(paths: TilePathGenerator) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &TilePathGenerator {
        &self.paths
    }
}

impl TileStore for FileTileStore {
    fn put(&self, layer: &str, key: &TileKey, data: &[u8]) -> Result<u64, StorageError> {
        let location = self.paths.locate(layer, key);
        fs::create_dir_all(&location.directory)?;
        fs::write(location.path(), data)?;
        Ok(data.len() as u64)
    }

    fn get(&self, layer: &str, key: &TileKey) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.paths.locate(layer, key).path()) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, layer: &str, key: &TileKey) -> Result<Option<u64>, StorageError> {
        let location = self.paths.locate(layer, key);
        let path = location.path();

        let size = match fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        remove_if_empty(&location.directory);
        Ok(Some(size))
    }
}

/// Drop an emptied bucket directory. Fails silently when other tiles remain.
fn remove_if_empty(directory: &Path) {
    if fs::remove_dir(directory).is_ok() {
        debug!(directory = %directory.display(), "Removed empty bucket directory");
    }
}

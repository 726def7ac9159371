//! Tile storage errors.

use std::io;
use thiserror::Error;

/// Errors raised by tile addressing and the tile store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while reading or writing tiles
    #[error("Tile storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// MIME type or extension not known to the format registry
    #[error("Unknown tile format '{0}'")]
    UnknownFormat(String),
}

//! Tile storage: formats, keys, on-disk addressing and the tile store.

mod error;
mod format;
mod key;
mod path;
mod store;

pub use error::StorageError;
pub use format::{FormatRegistry, TileFormat};
pub use key::TileKey;
pub use path::{
    decode_name, encode_name, parse_tile_file, parse_zoom_dir, zoom_directory_name, TileLocation,
    TilePathGenerator, ZoomDirectory,
};
pub use store::{FileTileStore, TileStore};

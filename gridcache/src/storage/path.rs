//! On-disk tile addressing.
//!
//! Tiles live in a fixed hierarchy below the cache root:
//!
//! ```text
//! <root>/<layer>/<gridset>_<zz>[_<params>]/<bx>_<by>/<x>_<y>.<ext>
//! ```
//!
//! Layer and grid set names are percent-escaped so that `_` only ever
//! appears as a separator, which keeps the mapping from tile keys to paths
//! injective. Tiles are spread over bucket directories whose size grows
//! with the zoom level so that no directory holds too many entries.

use std::path::{Path, PathBuf};

use crate::grid::TileIndex;

use super::key::TileKey;

/// Largest shift applied when computing bucket sizes.
const MAX_BUCKET_SHIFT: u32 = 62;

/// Directory and file name of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileLocation {
    pub directory: PathBuf,
    pub filename: String,
}

impl TileLocation {
    /// Full path of the tile file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Parsed name of a zoom directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomDirectory {
    pub gridset_id: String,
    pub z: u32,
    pub parameters_id: Option<u64>,
}

/// Maps tile keys to paths below a cache root.
///
/// Shared by the tile store and the cache scanner so both agree on where a
/// tile lives.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use gridcache::grid::TileIndex;
/// use gridcache::storage::{TileFormat, TileKey, TilePathGenerator};
///
/// let paths = TilePathGenerator::new("/cache");
/// let key = TileKey::new("EPSG:4326", TileIndex::new(5, 2, 3), TileFormat::Png);
/// let location = paths.locate("topp:states", &key);
///
/// assert_eq!(
///     location.path(),
///     PathBuf::from("/cache/topp%3Astates/EPSG%3A4326_03/1_0/05_02.png")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePathGenerator {
    root: PathBuf,
}

impl TilePathGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every tile of a layer.
    pub fn layer_directory(&self, layer: &str) -> PathBuf {
        self.root.join(encode_name(layer))
    }

    /// Canonical location of a tile.
    pub fn locate(&self, layer: &str, key: &TileKey) -> TileLocation {
        let TileIndex { x, y, z } = key.index;
        let half = bucket_size(z);
        let digits = bucket_digits(half);

        let directory = self
            .layer_directory(layer)
            .join(zoom_directory_name(&key.gridset_id, z, key.parameters_id))
            .join(format!(
                "{:0width$}_{:0width$}",
                x / half,
                y / half,
                width = digits
            ));
        let filename = format!(
            "{:0width$}_{:0width$}.{}",
            x,
            y,
            key.format.extension(),
            width = 2 * digits
        );

        TileLocation {
            directory,
            filename,
        }
    }
}

/// Name of the directory holding one zoom level of a grid set.
pub fn zoom_directory_name(gridset_id: &str, z: u32, parameters_id: Option<u64>) -> String {
    match parameters_id {
        Some(id) => format!("{}_{:02}_{:x}", encode_name(gridset_id), z, id),
        None => format!("{}_{:02}", encode_name(gridset_id), z),
    }
}

/// Inverse of [`zoom_directory_name`]. Returns `None` for foreign names.
pub fn parse_zoom_dir(name: &str) -> Option<ZoomDirectory> {
    let mut parts = name.split('_');
    let gridset_id = decode_name(parts.next()?)?;
    let z = parse_digits(parts.next()?)?;
    let parameters_id = match parts.next() {
        Some(hex) => Some(u64::from_str_radix(hex, 16).ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(ZoomDirectory {
        gridset_id,
        z: u32::try_from(z).ok()?,
        parameters_id,
    })
}

/// Split a tile file name into `(x, y, extension)`.
pub fn parse_tile_file(name: &str) -> Option<(u64, u64, &str)> {
    let (stem, extension) = name.rsplit_once('.')?;
    let (x, y) = stem.split_once('_')?;
    Some((parse_digits(x)?, parse_digits(y)?, extension))
}

/// Percent-escape every byte outside `[A-Za-z0-9-]`.
pub fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Inverse of [`encode_name`]. Returns `None` for malformed escapes or
/// invalid UTF-8.
pub fn decode_name(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

/// Tiles per bucket edge at zoom `z`.
fn bucket_size(z: u32) -> u64 {
    2u64 << (z / 2).min(MAX_BUCKET_SHIFT)
}

/// Decimal digits used for bucket coordinates.
fn bucket_digits(half: u64) -> usize {
    if half <= 10 {
        1
    } else {
        half.ilog10() as usize + 1
    }
}

/// Parse a run of ASCII digits, rejecting signs and empty strings.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

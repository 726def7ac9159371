//! Tile formats and their file extensions.

use std::collections::HashMap;
use std::fmt;

use super::error::StorageError;

/// Encoded format of a cached tile.
///
/// Every variant has its own extension so tiles of different formats never
/// share a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileFormat {
    Png,
    /// 8-bit paletted PNG
    Png8,
    Jpeg,
    Gif,
    Tiff,
    Kml,
    Kmz,
}

impl TileFormat {
    pub const ALL: [TileFormat; 7] = [
        TileFormat::Png,
        TileFormat::Png8,
        TileFormat::Jpeg,
        TileFormat::Gif,
        TileFormat::Tiff,
        TileFormat::Kml,
        TileFormat::Kmz,
    ];

    /// Canonical MIME type.
    pub fn mime_type(self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Png8 => "image/png; mode=8bit",
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::Gif => "image/gif",
            TileFormat::Tiff => "image/tiff",
            TileFormat::Kml => "application/vnd.google-earth.kml+xml",
            TileFormat::Kmz => "application/vnd.google-earth.kmz",
        }
    }

    /// File extension used on disk, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Png8 => "png8",
            TileFormat::Jpeg => "jpeg",
            TileFormat::Gif => "gif",
            TileFormat::Tiff => "tiff",
            TileFormat::Kml => "kml",
            TileFormat::Kmz => "kmz",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Lookup of tile formats by MIME type or extension.
///
/// Preloaded with every [`TileFormat`]; extra MIME aliases can be added.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    by_mime: HashMap<String, TileFormat>,
    by_extension: HashMap<&'static str, TileFormat>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            by_mime: HashMap::new(),
            by_extension: HashMap::new(),
        };
        for format in TileFormat::ALL {
            registry
                .by_mime
                .insert(normalize_mime(format.mime_type()), format);
            registry.by_extension.insert(format.extension(), format);
        }
        registry.add_alias("image/jpg", TileFormat::Jpeg);
        registry.add_alias("image/png8", TileFormat::Png8);
        registry
    }

    /// Map an additional MIME type onto an existing format.
    pub fn add_alias(&mut self, mime_type: &str, format: TileFormat) {
        self.by_mime.insert(normalize_mime(mime_type), format);
    }

    /// Resolve a MIME type. Case and whitespace around parameters are ignored.
    pub fn from_mime(&self, mime_type: &str) -> Result<TileFormat, StorageError> {
        self.by_mime
            .get(&normalize_mime(mime_type))
            .copied()
            .ok_or_else(|| StorageError::UnknownFormat(mime_type.to_string()))
    }

    /// Resolve a file extension (without the dot).
    pub fn from_extension(&self, extension: &str) -> Result<TileFormat, StorageError> {
        self.by_extension
            .get(extension)
            .copied()
            .ok_or_else(|| StorageError::UnknownFormat(extension.to_string()))
    }
}

fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .map(|part| part.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("; ")
}

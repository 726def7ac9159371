//! Grid set configuration errors.

use crate::bbox::BoundingBox;
use thiserror::Error;

/// Errors raised while building or registering grid sets.
///
/// Every variant is a configuration error: a layer depending on the grid set
/// must not be activated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridSetError {
    /// Extent with min >= max on either axis
    #[error("Extent {extent} of grid set '{name}' is not sane (min must be below max)")]
    InsaneExtent { name: String, extent: BoundingBox },

    /// No resolution levels were configured
    #[error("Grid set '{name}' has no resolution levels")]
    NoLevels { name: String },

    /// A resolution was zero, negative or not finite
    #[error("Grid set '{name}' level {level}: resolution {resolution} must be positive")]
    InvalidResolution {
        name: String,
        level: usize,
        resolution: f64,
    },

    /// A scale denominator was zero, negative or not finite
    #[error("Grid set '{name}' level {level}: scale denominator {scale} must be positive")]
    InvalidScale {
        name: String,
        level: usize,
        scale: f64,
    },

    /// Tile width or height of zero
    #[error("Grid set '{name}' tile size {width}x{height} must be positive")]
    InvalidTileSize {
        name: String,
        width: u32,
        height: u32,
    },

    /// Pixel size was zero, negative or not finite
    #[error("Grid set '{name}' pixel size {pixel_size} must be positive")]
    InvalidPixelSize { name: String, pixel_size: f64 },

    /// Meters per unit was zero, negative or not finite
    #[error("Grid set '{name}' meters per unit {meters_per_unit} must be positive")]
    InvalidMetersPerUnit { name: String, meters_per_unit: f64 },

    /// Scale name list does not match the number of levels
    #[error("Grid set '{name}' declares {names} scale names for {levels} levels")]
    ScaleNameMismatch {
        name: String,
        names: usize,
        levels: usize,
    },

    /// Spatial reference system identifier could not be resolved
    #[error("Unknown spatial reference system '{0}'")]
    UnknownSrs(String),

    /// Zoom range outside the grid set levels
    #[error("Zoom range {start}..={stop} is invalid for grid set '{name}' with {levels} levels")]
    InvalidZoomRange {
        name: String,
        start: u32,
        stop: u32,
        levels: usize,
    },

    /// No grid set registered under the name
    #[error("Grid set '{0}' is not registered")]
    UnknownGridSet(String),

    /// Grid set name already present in a broker
    #[error("Grid set '{0}' is already registered")]
    DuplicateGridSet(String),
}

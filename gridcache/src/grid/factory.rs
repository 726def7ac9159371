//! Grid set construction.
//!
//! A grid set is derived from an extent plus one of three level
//! descriptions (explicit resolutions, scale denominators or a level count).
//! Each level's tile extent is computed independently:
//!
//! ```text
//! tiles_wide = ceil(width  / (resolution * tile_width))
//! tiles_high = ceil(height / (resolution * tile_height))
//! ```
//!
//! The origin never moves. Whatever the ceiling adds is absorbed on the max
//! edges, so coarser levels are not required to nest inside finer ones.

use tracing::debug;

use crate::bbox::BoundingBox;

use super::error::GridSetError;
use super::grid_set::{Grid, GridSet};
use super::srs::Srs;

/// Standard rendering pixel size in meters (0.28 mm).
pub const DEFAULT_PIXEL_SIZE: f64 = 0.00028;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// How the levels of a grid set are described.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolutions {
    /// Map units per pixel for each level, used in the given order.
    Explicit(Vec<f64>),
    /// Scale denominators, converted with the pixel size and meters per unit.
    ScaleDenominators(Vec<f64>),
    /// Number of levels; level 0 is fitted to the extent and each further
    /// level halves the resolution.
    Levels(u32),
}

/// Everything needed to build a [`GridSet`].
///
/// ```
/// use gridcache::bbox::BoundingBox;
/// use gridcache::grid::{GridSetDefinition, GridSetFactory, Resolutions, Srs};
///
/// let definition = GridSetDefinition::new(
///     "world",
///     Srs::EPSG_4326,
///     BoundingBox::WORLD_4326,
///     Resolutions::Levels(4),
/// );
/// let grid_set = GridSetFactory::create_grid_set(definition).unwrap();
///
/// assert_eq!(grid_set.extent(0), Some((2, 1)));
/// assert_eq!(grid_set.extent(3), Some((16, 8)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GridSetDefinition {
    pub name: String,
    pub srs: Srs,
    pub extent: BoundingBox,
    pub align_top_left: bool,
    pub levels: Resolutions,
    /// Overrides the SRS derived value when set.
    pub meters_per_unit: Option<f64>,
    pub pixel_size: f64,
    pub scale_names: Option<Vec<String>>,
    pub tile_width: u32,
    pub tile_height: u32,
    pub y_coordinate_first: bool,
    pub whole_world: bool,
}

impl GridSetDefinition {
    /// Create a definition with 256x256 tiles, bottom-left alignment and the
    /// default pixel size.
    pub fn new(
        name: impl Into<String>,
        srs: Srs,
        extent: BoundingBox,
        levels: Resolutions,
    ) -> Self {
        Self {
            name: name.into(),
            srs,
            extent,
            align_top_left: false,
            levels,
            meters_per_unit: None,
            pixel_size: DEFAULT_PIXEL_SIZE,
            scale_names: None,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            y_coordinate_first: false,
            whole_world: false,
        }
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_meters_per_unit(mut self, meters_per_unit: f64) -> Self {
        self.meters_per_unit = Some(meters_per_unit);
        self
    }

    pub fn with_scale_names(mut self, names: Vec<String>) -> Self {
        self.scale_names = Some(names);
        self
    }

    pub fn aligned_top_left(mut self, align: bool) -> Self {
        self.align_top_left = align;
        self
    }

    pub fn with_y_coordinate_first(mut self, y_first: bool) -> Self {
        self.y_coordinate_first = y_first;
        self
    }

    pub fn whole_world(mut self, whole_world: bool) -> Self {
        self.whole_world = whole_world;
        self
    }
}

/// Builds grid sets from definitions.
pub struct GridSetFactory;

impl GridSetFactory {
    /// Build an immutable grid set.
    ///
    /// # Errors
    ///
    /// Returns a [`GridSetError`] for an insane extent, a zero tile size,
    /// non-positive resolutions, scales, pixel size or meters per unit, an
    /// empty level list, or scale names that do not match the level count.
    pub fn create_grid_set(definition: GridSetDefinition) -> Result<GridSet, GridSetError> {
        let GridSetDefinition {
            name,
            srs,
            extent,
            align_top_left,
            levels,
            meters_per_unit,
            pixel_size,
            scale_names,
            tile_width,
            tile_height,
            y_coordinate_first,
            whole_world,
        } = definition;

        if !extent.is_sane() {
            return Err(GridSetError::InsaneExtent { name, extent });
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(GridSetError::InvalidTileSize {
                name,
                width: tile_width,
                height: tile_height,
            });
        }
        if !is_positive(pixel_size) {
            return Err(GridSetError::InvalidPixelSize { name, pixel_size });
        }

        let meters_per_unit = meters_per_unit.unwrap_or_else(|| srs.meters_per_unit());
        if !is_positive(meters_per_unit) {
            return Err(GridSetError::InvalidMetersPerUnit {
                name,
                meters_per_unit,
            });
        }

        let resolutions = match levels {
            Resolutions::Explicit(resolutions) => resolutions,
            Resolutions::ScaleDenominators(scales) => {
                if let Some((level, &scale)) =
                    scales.iter().enumerate().find(|(_, s)| !is_positive(**s))
                {
                    return Err(GridSetError::InvalidScale { name, level, scale });
                }
                scales
                    .iter()
                    .map(|scale| scale * pixel_size / meters_per_unit)
                    .collect()
            }
            Resolutions::Levels(count) => {
                fitted_resolutions(&extent, tile_width, tile_height, count)
            }
        };

        if resolutions.is_empty() {
            return Err(GridSetError::NoLevels { name });
        }
        if let Some((level, &resolution)) = resolutions
            .iter()
            .enumerate()
            .find(|(_, r)| !is_positive(**r))
        {
            return Err(GridSetError::InvalidResolution {
                name,
                level,
                resolution,
            });
        }
        if let Some(names) = &scale_names {
            if names.len() != resolutions.len() {
                return Err(GridSetError::ScaleNameMismatch {
                    name,
                    names: names.len(),
                    levels: resolutions.len(),
                });
            }
        }

        let grids: Vec<Grid> = resolutions
            .iter()
            .enumerate()
            .map(|(level, &resolution)| Grid {
                name: scale_names
                    .as_ref()
                    .map(|names| names[level].clone())
                    .unwrap_or_else(|| format!("{}:{}", name, level)),
                resolution,
                scale_denominator: resolution * meters_per_unit / pixel_size,
                extent: (
                    tiles_covering(extent.width(), resolution, tile_width),
                    tiles_covering(extent.height(), resolution, tile_height),
                ),
            })
            .collect();

        debug!(
            gridset = %name,
            srs = %srs,
            levels = grids.len(),
            tile_width,
            tile_height,
            "Grid set created"
        );

        Ok(GridSet {
            name,
            srs,
            base_coords: (extent.minx, extent.miny),
            original_extent: extent,
            grids,
            tile_width,
            tile_height,
            meters_per_unit,
            pixel_size,
            top_left_aligned: align_top_left,
            y_coordinate_first,
            whole_world,
        })
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Number of tiles of `tile_size` pixels at `resolution` needed to span
/// `span` map units, never less than one.
fn tiles_covering(span: f64, resolution: f64, tile_size: u32) -> u64 {
    let tiles = (span / (resolution * f64::from(tile_size))).ceil();
    if tiles < 1.0 {
        1
    } else {
        // `as` saturates for absurdly fine resolutions
        tiles as u64
    }
}

/// Resolutions for the level-count mode.
///
/// Level 0 is fitted to the extent's aspect ratio: along the shorter axis a
/// single tile, along the longer axis the nearest whole number of tiles. The
/// coarser of the two per-axis resolutions wins so the whole extent is
/// covered.
fn fitted_resolutions(
    extent: &BoundingBox,
    tile_width: u32,
    tile_height: u32,
    levels: u32,
) -> Vec<f64> {
    let mut res_x = extent.width() / f64::from(tile_width);
    let mut res_y = extent.height() / f64::from(tile_height);

    if res_x <= res_y {
        let tiles_high = (res_y / res_x).round().max(1.0);
        res_y /= tiles_high;
    } else {
        let tiles_wide = (res_x / res_y).round().max(1.0);
        res_x /= tiles_wide;
    }

    let top = res_x.max(res_y);
    (0..levels)
        .map(|level| top / 2f64.powi(level as i32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_covering_rounds_up() {
        assert_eq!(tiles_covering(360.0, 180.0 / 256.0, 256), 2);
        assert_eq!(tiles_covering(353.0, 0.9, 200), 2);
        assert_eq!(tiles_covering(186.0, 0.225, 200), 5);
    }

    #[test]
    fn test_tiles_covering_never_below_one() {
        assert_eq!(tiles_covering(1.0, 1000.0, 256), 1);
    }

    #[test]
    fn test_fitted_resolutions_wide_extent() {
        let resolutions = fitted_resolutions(&BoundingBox::WORLD_4326, 256, 256, 3);
        assert_eq!(resolutions, vec![180.0 / 256.0, 180.0 / 512.0, 180.0 / 1024.0]);
    }

    #[test]
    fn test_fitted_resolutions_tall_extent() {
        let extent = BoundingBox::new(0.0, 0.0, 100.0, 200.0);
        let resolutions = fitted_resolutions(&extent, 100, 100, 1);
        // one tile wide, two tiles high
        assert_eq!(resolutions, vec![1.0]);
    }

    #[test]
    fn test_fitted_resolutions_square_extent() {
        let resolutions = fitted_resolutions(&BoundingBox::WORLD_3857, 256, 256, 2);
        assert_eq!(resolutions[0], BoundingBox::WORLD_3857.width() / 256.0);
        assert_eq!(resolutions[1], BoundingBox::WORLD_3857.width() / 512.0);
    }
}

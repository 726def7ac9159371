//! Immutable multi-resolution tile matrix.

use crate::bbox::BoundingBox;

use super::srs::Srs;

/// One resolution level of a [`GridSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub(crate) name: String,
    pub(crate) resolution: f64,
    pub(crate) scale_denominator: f64,
    pub(crate) extent: (u64, u64),
}

impl Grid {
    /// Level name (configured scale name or `<gridset>:<level>`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn scale_denominator(&self) -> f64 {
        self.scale_denominator
    }

    /// Number of tiles `(wide, high)`, both at least 1.
    pub fn extent(&self) -> (u64, u64) {
        self.extent
    }

    pub fn tiles_wide(&self) -> u64 {
        self.extent.0
    }

    pub fn tiles_high(&self) -> u64 {
        self.extent.1
    }

    /// Total tiles on this level, saturating at `u64::MAX`.
    pub fn tile_count(&self) -> u64 {
        self.extent.0.saturating_mul(self.extent.1)
    }
}

/// The tile matrix set for one coordinate reference system.
///
/// Built once by [`GridSetFactory`](super::GridSetFactory) and shared
/// read-only (normally behind an `Arc`) for the lifetime of the process.
/// Levels are kept in the order they were configured.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSet {
    pub(crate) name: String,
    pub(crate) srs: Srs,
    pub(crate) base_coords: (f64, f64),
    pub(crate) original_extent: BoundingBox,
    pub(crate) grids: Vec<Grid>,
    pub(crate) tile_width: u32,
    pub(crate) tile_height: u32,
    pub(crate) meters_per_unit: f64,
    pub(crate) pixel_size: f64,
    pub(crate) top_left_aligned: bool,
    pub(crate) y_coordinate_first: bool,
    pub(crate) whole_world: bool,
}

impl GridSet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn srs(&self) -> Srs {
        self.srs
    }

    /// Grid origin, always `(extent.minx, extent.miny)`.
    pub fn base_coords(&self) -> (f64, f64) {
        self.base_coords
    }

    /// Extent the grid set was configured with.
    pub fn bounds(&self) -> &BoundingBox {
        &self.original_extent
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn grid(&self, level: usize) -> Option<&Grid> {
        self.grids.get(level)
    }

    pub fn num_levels(&self) -> usize {
        self.grids.len()
    }

    pub fn resolution(&self, level: usize) -> Option<f64> {
        self.grid(level).map(Grid::resolution)
    }

    pub fn extent(&self, level: usize) -> Option<(u64, u64)> {
        self.grid(level).map(Grid::extent)
    }

    pub fn scale(&self, level: usize) -> Option<f64> {
        self.grid(level).map(Grid::scale_denominator)
    }

    /// Area actually covered by the tiles of `level`.
    ///
    /// Anchored at the base coordinates; the max edges include whatever the
    /// tile rounding added beyond the configured extent, so this differs from
    /// level to level.
    pub fn level_bounds(&self, level: usize) -> Option<BoundingBox> {
        let grid = self.grid(level)?;
        let (minx, miny) = self.base_coords;
        let width = grid.tiles_wide() as f64 * grid.resolution * f64::from(self.tile_width);
        let height = grid.tiles_high() as f64 * grid.resolution * f64::from(self.tile_height);

        Some(BoundingBox::new(minx, miny, minx + width, miny + height))
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn is_top_left_aligned(&self) -> bool {
        self.top_left_aligned
    }

    pub fn is_y_coordinate_first(&self) -> bool {
        self.y_coordinate_first
    }

    pub fn is_whole_world(&self) -> bool {
        self.whole_world
    }
}

//! A layer's restriction of a grid set.

use std::sync::Arc;

use crate::bbox::BoundingBox;

use super::error::GridSetError;
use super::grid_set::GridSet;
use super::index::TileIndex;

/// Inclusive range of tile indices on one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub minx: u64,
    pub miny: u64,
    pub maxx: u64,
    pub maxy: u64,
}

impl Coverage {
    pub fn contains(&self, x: u64, y: u64) -> bool {
        (self.minx..=self.maxx).contains(&x) && (self.miny..=self.maxy).contains(&y)
    }

    pub fn tile_count(&self) -> u64 {
        (self.maxx - self.minx + 1).saturating_mul(self.maxy - self.miny + 1)
    }
}

/// Zoom range and per-level coverage a layer serves from a grid set.
#[derive(Debug, Clone)]
pub struct GridSubset {
    grid_set: Arc<GridSet>,
    zoom_start: u32,
    zoom_stop: u32,
    /// One entry per level in `zoom_start..=zoom_stop`; `None` where the
    /// level has no tiles inside the subset.
    coverages: Vec<Option<Coverage>>,
}

impl GridSubset {
    /// Every tile of every level.
    pub fn full(grid_set: Arc<GridSet>) -> Self {
        let zoom_stop = grid_set.num_levels().saturating_sub(1) as u32;
        let coverages = full_coverages(&grid_set, 0, zoom_stop);

        Self {
            grid_set,
            zoom_start: 0,
            zoom_stop,
            coverages,
        }
    }

    /// Every tile of the levels `zoom_start..=zoom_stop`.
    pub fn with_zoom_range(
        grid_set: Arc<GridSet>,
        zoom_start: u32,
        zoom_stop: u32,
    ) -> Result<Self, GridSetError> {
        check_zoom_range(&grid_set, zoom_start, zoom_stop)?;
        let coverages = full_coverages(&grid_set, zoom_start, zoom_stop);

        Ok(Self {
            grid_set,
            zoom_start,
            zoom_stop,
            coverages,
        })
    }

    /// Tiles intersecting `bounds` on the levels `zoom_start..=zoom_stop`.
    ///
    /// Indices are clamped to each level's extent. Levels the bounds do not
    /// reach get no coverage.
    pub fn from_bounds(
        grid_set: Arc<GridSet>,
        bounds: BoundingBox,
        zoom_start: u32,
        zoom_stop: u32,
    ) -> Result<Self, GridSetError> {
        if !bounds.is_sane() {
            return Err(GridSetError::InsaneExtent {
                name: grid_set.name().to_string(),
                extent: bounds,
            });
        }
        check_zoom_range(&grid_set, zoom_start, zoom_stop)?;

        let coverages = (zoom_start..=zoom_stop)
            .map(|z| bounded_coverage(&grid_set, z as usize, &bounds))
            .collect();

        Ok(Self {
            grid_set,
            zoom_start,
            zoom_stop,
            coverages,
        })
    }

    /// Name of the underlying grid set.
    pub fn name(&self) -> &str {
        self.grid_set.name()
    }

    pub fn grid_set(&self) -> &Arc<GridSet> {
        &self.grid_set
    }

    pub fn zoom_start(&self) -> u32 {
        self.zoom_start
    }

    pub fn zoom_stop(&self) -> u32 {
        self.zoom_stop
    }

    pub fn coverage(&self, z: u32) -> Option<Coverage> {
        if z < self.zoom_start || z > self.zoom_stop {
            return None;
        }
        self.coverages
            .get((z - self.zoom_start) as usize)
            .copied()
            .flatten()
    }

    /// Whether the tile lies inside the zoom range and the level coverage.
    pub fn covers(&self, index: &TileIndex) -> bool {
        self.coverage(index.z)
            .is_some_and(|coverage| coverage.contains(index.x, index.y))
    }
}

fn check_zoom_range(grid_set: &GridSet, start: u32, stop: u32) -> Result<(), GridSetError> {
    if start > stop || stop as usize >= grid_set.num_levels() {
        return Err(GridSetError::InvalidZoomRange {
            name: grid_set.name().to_string(),
            start,
            stop,
            levels: grid_set.num_levels(),
        });
    }
    Ok(())
}

fn full_coverages(grid_set: &GridSet, start: u32, stop: u32) -> Vec<Option<Coverage>> {
    (start..=stop)
        .map(|z| {
            grid_set.extent(z as usize).map(|(wide, high)| Coverage {
                minx: 0,
                miny: 0,
                maxx: wide - 1,
                maxy: high - 1,
            })
        })
        .collect()
}

fn bounded_coverage(grid_set: &GridSet, level: usize, bounds: &BoundingBox) -> Option<Coverage> {
    let grid = grid_set.grid(level)?;
    let span_x = grid.resolution() * f64::from(grid_set.tile_width());
    let span_y = grid.resolution() * f64::from(grid_set.tile_height());
    let (origin_x, origin_y) = grid_set.base_coords();

    let (low_y, high_y) = if grid_set.is_top_left_aligned() {
        // rows count downwards from the top of the configured extent
        let top = grid_set.bounds().maxy;
        ((top - bounds.maxy) / span_y, (top - bounds.miny) / span_y)
    } else {
        ((bounds.miny - origin_y) / span_y, (bounds.maxy - origin_y) / span_y)
    };
    let low_x = (bounds.minx - origin_x) / span_x;
    let high_x = (bounds.maxx - origin_x) / span_x;
    if !overlaps(low_x, high_x, grid.tiles_wide())
        || !overlaps(low_y, high_y, grid.tiles_high())
    {
        return None;
    }

    let (minx, maxx) = index_range(low_x, high_x, grid.tiles_wide());
    let (miny, maxy) = index_range(low_y, high_y, grid.tiles_high());

    Some(Coverage {
        minx,
        miny,
        maxx,
        maxy,
    })
}

/// Whether the fractional span `low..high` reaches into `0..tiles`.
fn overlaps(low: f64, high: f64, tiles: u64) -> bool {
    high > 0.0 && low < tiles as f64
}

/// Inclusive tile range for the fractional span `low..high`, clamped to
/// `0..tiles`.
fn index_range(low: f64, high: f64, tiles: u64) -> (u64, u64) {
    let last = (tiles - 1) as f64;
    let min = low.floor().clamp(0.0, last);
    let max = (high.ceil() - 1.0).clamp(min, last);
    (min as u64, max as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::broker::world_epsg4326;

    fn world() -> Arc<GridSet> {
        Arc::new(world_epsg4326().unwrap())
    }

    #[test]
    fn test_full_subset_covers_every_level() {
        let subset = GridSubset::full(world());

        assert_eq!(subset.zoom_start(), 0);
        assert_eq!(subset.zoom_stop(), 21);
        assert_eq!(
            subset.coverage(0),
            Some(Coverage {
                minx: 0,
                miny: 0,
                maxx: 1,
                maxy: 0
            })
        );
        assert_eq!(subset.coverage(3).unwrap().tile_count(), 16 * 8);
        assert!(subset.coverage(22).is_none());
    }

    #[test]
    fn test_zoom_range_restricts_levels() {
        let subset = GridSubset::with_zoom_range(world(), 2, 4).unwrap();

        assert!(subset.coverage(1).is_none());
        assert!(subset.coverage(2).is_some());
        assert!(subset.coverage(4).is_some());
        assert!(subset.coverage(5).is_none());
        assert!(!subset.covers(&TileIndex::new(0, 0, 5)));
        assert!(subset.covers(&TileIndex::new(7, 3, 2)));
        assert!(!subset.covers(&TileIndex::new(8, 3, 2)));
    }

    #[test]
    fn test_invalid_zoom_range() {
        assert!(matches!(
            GridSubset::with_zoom_range(world(), 5, 2),
            Err(GridSetError::InvalidZoomRange { .. })
        ));
        assert!(matches!(
            GridSubset::with_zoom_range(world(), 0, 22),
            Err(GridSetError::InvalidZoomRange { .. })
        ));
    }

    #[test]
    fn test_bounds_subset_eastern_hemisphere() {
        let bounds = BoundingBox::new(0.0, -90.0, 180.0, 90.0);
        let subset = GridSubset::from_bounds(world(), bounds, 0, 2).unwrap();

        // level 0: two 180 degree tiles, only the eastern one
        assert_eq!(
            subset.coverage(0),
            Some(Coverage {
                minx: 1,
                miny: 0,
                maxx: 1,
                maxy: 0
            })
        );
        // level 2: 8x4 tiles of 45 degrees
        assert_eq!(
            subset.coverage(2),
            Some(Coverage {
                minx: 4,
                miny: 0,
                maxx: 7,
                maxy: 3
            })
        );
    }

    #[test]
    fn test_bounds_subset_clamps_outside_extent() {
        let bounds = BoundingBox::new(-400.0, -200.0, 400.0, 200.0);
        let subset = GridSubset::from_bounds(world(), bounds, 1, 1).unwrap();

        assert_eq!(
            subset.coverage(1),
            Some(Coverage {
                minx: 0,
                miny: 0,
                maxx: 3,
                maxy: 1
            })
        );
    }

    #[test]
    fn test_bounds_outside_extent_have_no_coverage() {
        let east = BoundingBox::new(200.0, 0.0, 300.0, 10.0);
        let subset = GridSubset::from_bounds(world(), east, 0, 3).unwrap();

        for z in 0..=3 {
            assert!(subset.coverage(z).is_none());
        }
        assert!(!subset.covers(&TileIndex::new(15, 4, 3)));

        // touching the edge is not overlapping
        let north = BoundingBox::new(-10.0, 90.0, 10.0, 120.0);
        let subset = GridSubset::from_bounds(world(), north, 2, 2).unwrap();
        assert!(subset.coverage(2).is_none());
    }

    #[test]
    fn test_bounds_subset_rejects_insane_bounds() {
        let bounds = BoundingBox::new(10.0, 0.0, -10.0, 5.0);
        assert!(matches!(
            GridSubset::from_bounds(world(), bounds, 0, 1),
            Err(GridSetError::InsaneExtent { .. })
        ));
    }
}

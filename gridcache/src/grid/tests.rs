//! Grid set construction cases.

use super::*;
use crate::bbox::BoundingBox;

const MERCATOR_HALF: f64 = 20037508.34;

fn build(extent: BoundingBox, srs: Srs, levels: Resolutions, tile: u32) -> GridSet {
    GridSetFactory::create_grid_set(
        GridSetDefinition::new("test", srs, extent, levels).with_tile_size(tile, tile),
    )
    .unwrap()
}

fn mercator_extent() -> BoundingBox {
    BoundingBox::new(-MERCATOR_HALF, -MERCATOR_HALF, MERCATOR_HALF, MERCATOR_HALF)
}

// =========================================================================
// Explicit resolutions
// =========================================================================

#[test]
fn test_resolutions_epsg4326() {
    let resolutions = vec![180.0 / 256.0, 180.0 / 512.0, 180.0 / 1024.0, 180.0 / 2048.0];
    let grid_set = build(
        BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        Srs::EPSG_4326,
        Resolutions::Explicit(resolutions.clone()),
        256,
    );

    assert_eq!(grid_set.name(), "test");
    assert_eq!(grid_set.base_coords(), (-180.0, -90.0));
    assert_eq!(grid_set.num_levels(), resolutions.len());

    assert_eq!(grid_set.resolution(0), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((2, 1)));

    assert_eq!(grid_set.resolution(3), Some(180.0 / 2048.0));
    assert_eq!(grid_set.extent(3), Some((16, 8)));
}

#[test]
fn test_resolutions_epsg3857() {
    let width = MERCATOR_HALF * 2.0;
    let grid_set = build(
        mercator_extent(),
        Srs::EPSG_3857,
        Resolutions::Explicit(vec![
            width / 256.0,
            width / 512.0,
            width / 1024.0,
            width / 2048.0,
        ]),
        256,
    );

    assert_eq!(grid_set.resolution(0), Some(width / 256.0));
    assert_eq!(grid_set.extent(0), Some((1, 1)));
    assert_eq!(grid_set.extent(3), Some((8, 8)));
}

#[test]
fn test_resolutions_expanded_on_max_edges() {
    let resolutions = vec![180.0 / 200.0, 180.0 / 400.0, 180.0 / 800.0];
    let grid_set = build(
        BoundingBox::new(-173.0, -90.0, 180.0, 96.0),
        Srs::EPSG_4326,
        Resolutions::Explicit(resolutions),
        200,
    );

    assert_eq!(grid_set.base_coords(), (-173.0, -90.0));
    assert_eq!(grid_set.num_levels(), 3);

    assert_eq!(grid_set.resolution(0), Some(180.0 / 200.0));
    assert_eq!(grid_set.extent(0), Some((2, 2)));

    assert_eq!(grid_set.resolution(2), Some(180.0 / 800.0));
    assert_eq!(grid_set.extent(2), Some((8, 5)));
}

#[test]
fn test_level_order_is_preserved() {
    let grid_set = build(
        BoundingBox::WORLD_4326,
        Srs::EPSG_4326,
        Resolutions::Explicit(vec![180.0 / 1024.0, 180.0 / 256.0]),
        256,
    );

    assert_eq!(grid_set.resolution(0), Some(180.0 / 1024.0));
    assert_eq!(grid_set.extent(0), Some((8, 4)));
    assert_eq!(grid_set.resolution(1), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(1), Some((2, 1)));
}

#[test]
fn test_level_bounds_include_rounding() {
    let grid_set = build(
        BoundingBox::new(-173.0, -90.0, 180.0, 96.0),
        Srs::EPSG_4326,
        Resolutions::Explicit(vec![180.0 / 200.0]),
        200,
    );

    let bounds = grid_set.level_bounds(0).unwrap();
    assert_eq!(bounds.minx, -173.0);
    assert_eq!(bounds.miny, -90.0);
    assert!(bounds.contains(grid_set.bounds()));
    assert!(grid_set.level_bounds(1).is_none());
}

// =========================================================================
// Level count
// =========================================================================

#[test]
fn test_levels_epsg4326() {
    let grid_set = build(
        BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        Srs::EPSG_4326,
        Resolutions::Levels(4),
        256,
    );

    assert_eq!(grid_set.name(), "test");
    assert_eq!(grid_set.base_coords(), (-180.0, -90.0));
    assert_eq!(grid_set.num_levels(), 4);

    assert_eq!(grid_set.resolution(0), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((2, 1)));

    assert_eq!(grid_set.resolution(3), Some(180.0 / 2048.0));
    assert_eq!(grid_set.extent(3), Some((16, 8)));
}

#[test]
fn test_levels_epsg3857() {
    let grid_set = build(mercator_extent(), Srs::EPSG_3857, Resolutions::Levels(6), 256);

    assert_eq!(grid_set.resolution(0), Some(MERCATOR_HALF * 2.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((1, 1)));
    assert_eq!(grid_set.extent(3), Some((8, 8)));
    assert_eq!(grid_set.num_levels(), 6);
}

#[test]
fn test_levels_narrow_extent() {
    let grid_set = build(
        BoundingBox::new(-180.0, -90.0, 172.0, 90.0),
        Srs::EPSG_4326,
        Resolutions::Levels(4),
        256,
    );

    assert_eq!(grid_set.base_coords(), (-180.0, -90.0));
    assert_eq!(grid_set.num_levels(), 4);
    assert_eq!(grid_set.resolution(0), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((2, 1)));
}

#[test]
fn test_levels_short_extent() {
    let grid_set = build(
        BoundingBox::new(-180.0, -90.0, 180.0, 82.0),
        Srs::EPSG_4326,
        Resolutions::Levels(4),
        256,
    );

    assert_eq!(grid_set.base_coords(), (-180.0, -90.0));
    assert_eq!(grid_set.resolution(0), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((2, 1)));
}

// =========================================================================
// Scales and metadata
// =========================================================================

#[test]
fn test_scale_denominators_convert_to_resolutions() {
    // 1 meter per unit so resolution = scale * pixel size
    let grid_set = build(
        mercator_extent(),
        Srs::EPSG_3857,
        Resolutions::ScaleDenominators(vec![1_000_000.0, 500_000.0]),
        256,
    );

    assert!((grid_set.resolution(0).unwrap() - 280.0).abs() < 1e-9);
    assert!((grid_set.resolution(1).unwrap() - 140.0).abs() < 1e-9);
    assert!((grid_set.scale(0).unwrap() - 1_000_000.0).abs() < 1e-3);
}

#[test]
fn test_grid_names_default_and_configured() {
    let defaulted = build(
        BoundingBox::WORLD_4326,
        Srs::EPSG_4326,
        Resolutions::Levels(2),
        256,
    );
    assert_eq!(defaulted.grid(1).unwrap().name(), "test:1");

    let named = GridSetFactory::create_grid_set(
        GridSetDefinition::new(
            "named",
            Srs::EPSG_4326,
            BoundingBox::WORLD_4326,
            Resolutions::Levels(2),
        )
        .with_scale_names(vec!["coarse".to_string(), "fine".to_string()]),
    )
    .unwrap();
    assert_eq!(named.grid(0).unwrap().name(), "coarse");
    assert_eq!(named.grid(1).unwrap().name(), "fine");
}

#[test]
fn test_meters_per_unit_follows_srs_unless_overridden() {
    let geographic = build(
        BoundingBox::WORLD_4326,
        Srs::EPSG_4326,
        Resolutions::Levels(1),
        256,
    );
    assert!((geographic.meters_per_unit() - 111_319.490_793).abs() < 1e-3);

    let overridden = GridSetFactory::create_grid_set(
        GridSetDefinition::new(
            "custom",
            Srs::EPSG_4326,
            BoundingBox::WORLD_4326,
            Resolutions::Levels(1),
        )
        .with_meters_per_unit(1.0),
    )
    .unwrap();
    assert_eq!(overridden.meters_per_unit(), 1.0);
}

// =========================================================================
// Configuration errors
// =========================================================================

fn create(definition: GridSetDefinition) -> GridSetError {
    GridSetFactory::create_grid_set(definition).unwrap_err()
}

fn definition(levels: Resolutions) -> GridSetDefinition {
    GridSetDefinition::new("bad", Srs::EPSG_4326, BoundingBox::WORLD_4326, levels)
}

#[test]
fn test_insane_extent_rejected() {
    let err = create(GridSetDefinition::new(
        "bad",
        Srs::EPSG_4326,
        BoundingBox::new(10.0, 0.0, 10.0, 5.0),
        Resolutions::Levels(3),
    ));
    assert!(matches!(err, GridSetError::InsaneExtent { .. }));
}

#[test]
fn test_empty_levels_rejected() {
    assert!(matches!(
        create(definition(Resolutions::Explicit(vec![]))),
        GridSetError::NoLevels { .. }
    ));
    assert!(matches!(
        create(definition(Resolutions::Levels(0))),
        GridSetError::NoLevels { .. }
    ));
}

#[test]
fn test_non_positive_resolution_rejected() {
    let err = create(definition(Resolutions::Explicit(vec![1.0, 0.0])));
    assert_eq!(
        err,
        GridSetError::InvalidResolution {
            name: "bad".to_string(),
            level: 1,
            resolution: 0.0,
        }
    );

    assert!(matches!(
        create(definition(Resolutions::Explicit(vec![f64::NAN]))),
        GridSetError::InvalidResolution { level: 0, .. }
    ));
}

#[test]
fn test_non_positive_scale_rejected() {
    let err = create(definition(Resolutions::ScaleDenominators(vec![-5.0])));
    assert!(matches!(err, GridSetError::InvalidScale { level: 0, .. }));
}

#[test]
fn test_zero_tile_size_rejected() {
    let err = create(definition(Resolutions::Levels(2)).with_tile_size(0, 256));
    assert!(matches!(err, GridSetError::InvalidTileSize { width: 0, .. }));
}

#[test]
fn test_bad_pixel_size_and_meters_per_unit_rejected() {
    assert!(matches!(
        create(definition(Resolutions::Levels(2)).with_pixel_size(0.0)),
        GridSetError::InvalidPixelSize { .. }
    ));
    assert!(matches!(
        create(definition(Resolutions::Levels(2)).with_meters_per_unit(-1.0)),
        GridSetError::InvalidMetersPerUnit { .. }
    ));
}

#[test]
fn test_scale_name_count_mismatch_rejected() {
    let err = create(
        definition(Resolutions::Levels(3)).with_scale_names(vec!["only".to_string()]),
    );
    assert_eq!(
        err,
        GridSetError::ScaleNameMismatch {
            name: "bad".to_string(),
            names: 1,
            levels: 3,
        }
    );
}

#[test]
fn test_out_of_range_level_is_none() {
    let grid_set = build(
        BoundingBox::WORLD_4326,
        Srs::EPSG_4326,
        Resolutions::Levels(2),
        256,
    );

    assert!(grid_set.resolution(2).is_none());
    assert!(grid_set.extent(2).is_none());
    assert!(grid_set.scale(2).is_none());
    assert!(grid_set.grid(2).is_none());
}

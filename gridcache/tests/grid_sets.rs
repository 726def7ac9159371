//! Integration tests for grid set construction through the public API.
//!
//! Run with: `cargo test --test grid_sets`

use std::sync::Arc;

use gridcache::bbox::BoundingBox;
use gridcache::grid::{
    GridSetBroker, GridSetDefinition, GridSetError, GridSetFactory, GridSubset, Resolutions, Srs,
    TileIndex, WORLD_EPSG3857, WORLD_EPSG4326,
};

#[test]
fn test_broker_world_grid_sets() {
    let broker = GridSetBroker::new().unwrap();

    let geographic = broker.get(WORLD_EPSG4326).unwrap();
    assert_eq!(geographic.srs(), Srs::EPSG_4326);
    assert_eq!(geographic.extent(0), Some((2, 1)));
    assert_eq!(geographic.resolution(0), Some(180.0 / 256.0));

    let mercator = broker.get(WORLD_EPSG3857).unwrap();
    assert_eq!(mercator.extent(0), Some((1, 1)));
    for level in 1..mercator.num_levels() {
        let (wide, high) = mercator.extent(level).unwrap();
        assert_eq!(wide, 1 << level);
        assert_eq!(high, 1 << level);
    }
}

#[test]
fn test_scale_denominators_match_resolutions() {
    let resolutions = vec![180.0 / 256.0, 180.0 / 512.0, 180.0 / 1024.0];
    let explicit = GridSetFactory::create_grid_set(GridSetDefinition::new(
        "explicit",
        Srs::EPSG_4326,
        BoundingBox::WORLD_4326,
        Resolutions::Explicit(resolutions),
    ))
    .unwrap();

    let scales: Vec<f64> = explicit.grids().iter().map(|g| g.scale_denominator()).collect();
    let from_scales = GridSetFactory::create_grid_set(GridSetDefinition::new(
        "scales",
        Srs::EPSG_4326,
        BoundingBox::WORLD_4326,
        Resolutions::ScaleDenominators(scales),
    ))
    .unwrap();

    assert_eq!(from_scales.num_levels(), explicit.num_levels());
    for level in 0..explicit.num_levels() {
        let a = explicit.resolution(level).unwrap();
        let b = from_scales.resolution(level).unwrap();
        assert!((a - b).abs() / a < 1e-9, "level {level}: {a} vs {b}");
    }
}

#[test]
fn test_levels_on_wide_extent() {
    // 2:1 extent: level 0 has two tiles across and one down
    let grid_set = GridSetFactory::create_grid_set(GridSetDefinition::new(
        "wide",
        Srs::EPSG_4326,
        BoundingBox::new(-180.0, -90.0, 172.0, 90.0),
        Resolutions::Levels(3),
    ))
    .unwrap();

    assert_eq!(grid_set.resolution(0), Some(180.0 / 256.0));
    assert_eq!(grid_set.extent(0), Some((2, 1)));
    assert_eq!(grid_set.extent(2), Some((8, 4)));
}

#[test]
fn test_invalid_definitions() {
    let insane = GridSetDefinition::new(
        "insane",
        Srs::EPSG_4326,
        BoundingBox::new(10.0, 0.0, 10.0, 5.0),
        Resolutions::Levels(2),
    );
    assert!(GridSetFactory::create_grid_set(insane).is_err());

    let no_levels = GridSetDefinition::new(
        "empty",
        Srs::EPSG_4326,
        BoundingBox::WORLD_4326,
        Resolutions::Explicit(Vec::new()),
    );
    assert!(GridSetFactory::create_grid_set(no_levels).is_err());

    assert!(matches!(
        "CRS:84".parse::<Srs>(),
        Err(GridSetError::UnknownSrs(_))
    ));
}

#[test]
fn test_subset_limits_coverage() {
    let broker = GridSetBroker::new().unwrap();
    let world = broker.get(WORLD_EPSG4326).unwrap();
    let east = GridSubset::from_bounds(
        Arc::clone(&world),
        BoundingBox::new(0.0, -90.0, 180.0, 90.0),
        0,
        2,
    )
    .unwrap();

    assert!(east.covers(&TileIndex::new(1, 0, 0)));
    assert!(!east.covers(&TileIndex::new(0, 0, 0)));
    assert!(east.covers(&TileIndex::new(7, 3, 2)));
    assert!(!east.covers(&TileIndex::new(3, 3, 2)));
    // outside the zoom range
    assert!(!east.covers(&TileIndex::new(12, 0, 3)));
}

//! Registry of named grid sets.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::bbox::BoundingBox;

use super::error::GridSetError;
use super::factory::{GridSetDefinition, GridSetFactory, Resolutions};
use super::grid_set::GridSet;
use super::srs::Srs;

/// Name of the built-in geographic world grid set.
pub const WORLD_EPSG4326: &str = "EPSG:4326";

/// Name of the built-in spherical mercator world grid set.
pub const WORLD_EPSG3857: &str = "EPSG:900913";

const WORLD_EPSG4326_LEVELS: u32 = 22;
const WORLD_EPSG3857_LEVELS: u32 = 31;

/// Grid sets by unique name, shared read-only once registered.
#[derive(Debug, Default)]
pub struct GridSetBroker {
    grid_sets: HashMap<String, Arc<GridSet>>,
}

impl GridSetBroker {
    /// Create a broker holding the two built-in world grid sets.
    pub fn new() -> Result<Self, GridSetError> {
        let mut broker = Self::empty();
        broker.put(world_epsg4326()?)?;
        broker.put(world_epsg3857()?)?;
        Ok(broker)
    }

    /// Create a broker with no grid sets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a grid set.
    ///
    /// # Errors
    ///
    /// [`GridSetError::DuplicateGridSet`] if the name is already taken.
    pub fn put(&mut self, grid_set: GridSet) -> Result<Arc<GridSet>, GridSetError> {
        if self.grid_sets.contains_key(grid_set.name()) {
            return Err(GridSetError::DuplicateGridSet(grid_set.name().to_string()));
        }

        info!(
            gridset = grid_set.name(),
            levels = grid_set.num_levels(),
            "Grid set registered"
        );

        let grid_set = Arc::new(grid_set);
        self.grid_sets
            .insert(grid_set.name().to_string(), Arc::clone(&grid_set));
        Ok(grid_set)
    }

    pub fn get(&self, name: &str) -> Option<Arc<GridSet>> {
        self.grid_sets.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.grid_sets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.grid_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid_sets.is_empty()
    }
}

/// Whole-world geographic grid set, two tiles wide at level 0.
pub fn world_epsg4326() -> Result<GridSet, GridSetError> {
    GridSetFactory::create_grid_set(
        GridSetDefinition::new(
            WORLD_EPSG4326,
            Srs::EPSG_4326,
            BoundingBox::WORLD_4326,
            Resolutions::Levels(WORLD_EPSG4326_LEVELS),
        )
        .with_y_coordinate_first(true)
        .whole_world(true),
    )
}

/// Whole-world spherical mercator grid set, one tile at level 0.
pub fn world_epsg3857() -> Result<GridSet, GridSetError> {
    GridSetFactory::create_grid_set(
        GridSetDefinition::new(
            WORLD_EPSG3857,
            Srs::EPSG_3857,
            BoundingBox::WORLD_3857,
            Resolutions::Levels(WORLD_EPSG3857_LEVELS),
        )
        .whole_world(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_has_world_grid_sets() {
        let broker = GridSetBroker::new().unwrap();

        assert_eq!(broker.names(), vec![WORLD_EPSG4326, WORLD_EPSG3857]);

        let geographic = broker.get(WORLD_EPSG4326).unwrap();
        assert_eq!(geographic.num_levels(), 22);
        assert_eq!(geographic.extent(0), Some((2, 1)));
        assert!(geographic.is_whole_world());

        let mercator = broker.get(WORLD_EPSG3857).unwrap();
        assert_eq!(mercator.num_levels(), 31);
        assert_eq!(mercator.extent(0), Some((1, 1)));
        assert_eq!(mercator.extent(10), Some((1024, 1024)));
    }

    #[test]
    fn test_put_rejects_duplicate_name() {
        let mut broker = GridSetBroker::new().unwrap();
        let result = broker.put(world_epsg4326().unwrap());

        assert_eq!(
            result.unwrap_err(),
            GridSetError::DuplicateGridSet(WORLD_EPSG4326.to_string())
        );
        assert_eq!(broker.len(), 2);
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let broker = GridSetBroker::empty();
        assert!(broker.is_empty());
        assert!(broker.get("EPSG:4326").is_none());
    }
}

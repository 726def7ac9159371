//! Multi-resolution tile grids.
//!
//! A [`GridSet`] is built once by [`GridSetFactory`] from a
//! [`GridSetDefinition`], registered in a [`GridSetBroker`] and then shared
//! read-only. Layers restrict a grid set through a [`GridSubset`].

mod broker;
mod error;
mod factory;
mod grid_set;
mod index;
mod srs;
mod subset;

#[cfg(test)]
mod tests;

pub use broker::{world_epsg3857, world_epsg4326, GridSetBroker, WORLD_EPSG3857, WORLD_EPSG4326};
pub use error::GridSetError;
pub use factory::{
    GridSetDefinition, GridSetFactory, Resolutions, DEFAULT_PIXEL_SIZE, DEFAULT_TILE_SIZE,
};
pub use grid_set::{Grid, GridSet};
pub use index::TileIndex;
pub use srs::Srs;
pub use subset::{Coverage, GridSubset};

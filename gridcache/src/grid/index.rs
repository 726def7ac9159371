//! Tile indices within a grid set.

use std::fmt;

/// Position of a tile: column `x`, row `y` and level `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub x: u64,
    pub y: u64,
    pub z: u32,
}

impl TileIndex {
    pub const fn new(x: u64, y: u64, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

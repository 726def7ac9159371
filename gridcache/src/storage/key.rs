//! Identity of a cached tile within a layer.

use std::fmt;

use crate::grid::TileIndex;

use super::format::TileFormat;

/// A tile within a layer: grid set, index, format and optional parameter
/// set id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub gridset_id: String,
    pub index: TileIndex,
    pub format: TileFormat,
    /// Hash of the request parameters that produced the tile
    pub parameters_id: Option<u64>,
}

impl TileKey {
    pub fn new(gridset_id: impl Into<String>, index: TileIndex, format: TileFormat) -> Self {
        Self {
            gridset_id: gridset_id.into(),
            index,
            format,
            parameters_id: None,
        }
    }

    pub fn with_parameters(mut self, parameters_id: u64) -> Self {
        self.parameters_id = Some(parameters_id);
        self
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.index, self.gridset_id, self.format.extension())?;
        if let Some(id) = self.parameters_id {
            write!(f, " params={:x}", id)?;
        }
        Ok(())
    }
}

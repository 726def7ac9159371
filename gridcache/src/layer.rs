//! Cached layers as seen by the quota engine.

use crate::grid::{GridSetBroker, GridSetError, GridSubset};

/// A layer whose tiles are cached.
///
/// The quota engine only needs the layer's name and the grid subsets it
/// serves; rendering and request handling live elsewhere.
pub trait TileLayer: Send + Sync {
    fn name(&self) -> &str;

    fn grid_subsets(&self) -> &[GridSubset];

    /// Subset for a grid set, if the layer serves it.
    fn grid_subset(&self, gridset_id: &str) -> Option<&GridSubset> {
        self.grid_subsets()
            .iter()
            .find(|subset| subset.name() == gridset_id)
    }
}

/// Plain [`TileLayer`] built from configuration.
#[derive(Debug, Clone)]
pub struct CachedLayer {
    name: String,
    grid_subsets: Vec<GridSubset>,
}

impl CachedLayer {
    pub fn new(name: impl Into<String>, grid_subsets: Vec<GridSubset>) -> Self {
        Self {
            name: name.into(),
            grid_subsets,
        }
    }

    /// Layer covering every level of each named grid set.
    ///
    /// # Errors
    ///
    /// [`GridSetError::UnknownGridSet`] if a name is not in the broker.
    pub fn with_full_coverage<S: AsRef<str>>(
        name: impl Into<String>,
        broker: &GridSetBroker,
        gridsets: &[S],
    ) -> Result<Self, GridSetError> {
        let grid_subsets = gridsets
            .iter()
            .map(|id| {
                broker
                    .get(id.as_ref())
                    .map(GridSubset::full)
                    .ok_or_else(|| GridSetError::UnknownGridSet(id.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(name, grid_subsets))
    }
}

impl TileLayer for CachedLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn grid_subsets(&self) -> &[GridSubset] {
        &self.grid_subsets
    }
}

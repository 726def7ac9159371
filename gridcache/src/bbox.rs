//! Rectangular extents in map units.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Relative tolerance used by [`BoundingBox::approx_eq`] when callers have
/// no better value.
pub const DEFAULT_EQUALITY_TOLERANCE: f64 = 0.01;

/// Error parsing a bounding box from its `minx,miny,maxx,maxy` form.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid bounding box '{input}' - expected four comma separated numbers")]
pub struct BoundingBoxParseError {
    input: String,
}

/// An axis-aligned rectangle `minx, miny, maxx, maxy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    /// Whole world in geographic coordinates (EPSG:4326).
    pub const WORLD_4326: BoundingBox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);

    /// Whole world in spherical mercator (EPSG:3857).
    pub const WORLD_3857: BoundingBox = BoundingBox::new(
        -20_037_508.34,
        -20_037_508.34,
        20_037_508.34,
        20_037_508.34,
    );

    pub const fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Minimal sanity check: min x below max x and min y below max y.
    ///
    /// NaN coordinates are never sane.
    pub fn is_sane(&self) -> bool {
        self.minx < self.maxx && self.miny < self.maxy
    }

    /// Whether `other` lies entirely within this box (edges inclusive).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.minx <= other.minx
            && self.miny <= other.miny
            && self.maxx >= other.maxx
            && self.maxy >= other.maxy
    }

    /// Tolerant comparison of two boxes.
    ///
    /// Each coordinate pair is compared by its relative difference
    /// `|a - b| / |a + b|` against `tolerance`; identical coordinates always
    /// match, whatever the tolerance. Only meant for diagnostics (e.g.
    /// warning that a configured extent drifted from a stored one).
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        close(self.minx, other.minx, tolerance)
            && close(self.miny, other.miny, tolerance)
            && close(self.maxx, other.maxx, tolerance)
            && close(self.maxy, other.maxy, tolerance)
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || ((a - b) / (a + b)).abs() < tolerance
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.minx, self.miny, self.maxx, self.maxy)
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || BoundingBoxParseError {
            input: s.to_string(),
        };

        let coords = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| error())?;

        match coords.as_slice() {
            [minx, miny, maxx, maxy] => Ok(Self::new(*minx, *miny, *maxx, *maxy)),
            _ => Err(error()),
        }
    }
}

//! Spatial reference system identifiers.

use std::fmt;
use std::str::FromStr;

use super::error::GridSetError;

/// WGS84 semi-major axis used to derive meters per degree.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Meters covered by one degree along the equator.
pub const METERS_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * EARTH_RADIUS_METERS / 360.0;

/// Legacy Google mercator code, treated as EPSG:3857.
const EPSG_900913: u32 = 900_913;

/// An EPSG coordinate reference system code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Srs {
    number: u32,
}

impl Srs {
    /// Geographic WGS84.
    pub const EPSG_4326: Srs = Srs { number: 4326 };

    /// Spherical mercator.
    pub const EPSG_3857: Srs = Srs { number: 3857 };

    /// Build an SRS from its EPSG number.
    ///
    /// Zero is not a valid code. `900913` is normalized to `3857`.
    pub fn epsg(number: u32) -> Result<Self, GridSetError> {
        match number {
            0 => Err(GridSetError::UnknownSrs(number.to_string())),
            EPSG_900913 => Ok(Self::EPSG_3857),
            _ => Ok(Self { number }),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Meters per map unit for this system.
    ///
    /// Geographic EPSG:4326 is measured in degrees; every other supported
    /// system is assumed to be projected in meters.
    pub fn meters_per_unit(&self) -> f64 {
        if *self == Self::EPSG_4326 {
            METERS_PER_DEGREE
        } else {
            1.0
        }
    }
}

impl fmt::Display for Srs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.number)
    }
}

impl FromStr for Srs {
    type Err = GridSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .map(|_| &trimmed[5..])
            .ok_or_else(|| GridSetError::UnknownSrs(s.to_string()))?;

        let number = code
            .trim()
            .parse::<u32>()
            .map_err(|_| GridSetError::UnknownSrs(s.to_string()))?;

        Self::epsg(number).map_err(|_| GridSetError::UnknownSrs(s.to_string()))
    }
}

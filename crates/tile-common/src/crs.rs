//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{GeoBounds, TileError};

/// Half of the geographic world width, in degrees.
pub const GEODETIC_ORIGIN_SHIFT: f64 = 180.0;

/// Half of the spherical Mercator world width, in meters (π × 6378137).
pub const MERCATOR_ORIGIN_SHIFT: f64 = 20037508.342789244;

/// Coordinate systems a source raster can be tiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// Spherical (Web) Mercator (meters)
    Epsg3857,
}

impl CoordinateSystem {
    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326" / "4326"
    /// - "CRS:84" (equivalent to EPSG:4326)
    /// - "EPSG:3857" / "EPSG:900913" / "3857"
    pub fn from_code(s: &str) -> Result<Self, TileError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "EPSG:4326" | "4326" | "CRS:84" => Ok(Self::Epsg4326),
            "EPSG:3857" | "3857" | "EPSG:900913" => Ok(Self::Epsg3857),
            _ => Err(TileError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Epsg4326)
    }

    /// Half the world extent along the X axis, in this system's units.
    pub fn origin_shift(&self) -> f64 {
        match self {
            Self::Epsg4326 => GEODETIC_ORIGIN_SHIFT,
            Self::Epsg3857 => MERCATOR_ORIGIN_SHIFT,
        }
    }

    /// Number of tile columns and rows at a zoom level.
    ///
    /// The geographic profile covers 360°×180° with square tiles, so it
    /// has twice as many columns as rows.
    pub fn matrix_size(&self, zoom: u32) -> (u32, u32) {
        let n = 1u32 << zoom;
        match self {
            Self::Epsg4326 => (n * 2, n),
            Self::Epsg3857 => (n, n),
        }
    }

    /// Get the valid bounds for this CRS.
    pub fn valid_bounds(&self) -> GeoBounds {
        match self {
            Self::Epsg4326 => GeoBounds::from_corners(*self, -180.0, -90.0, 180.0, 90.0),
            Self::Epsg3857 => {
                let max_extent = MERCATOR_ORIGIN_SHIFT;
                GeoBounds::from_corners(*self, -max_extent, -max_extent, max_extent, max_extent)
            }
        }
    }
}

impl FromStr for CoordinateSystem {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Epsg4326 => "EPSG:4326",
            Self::Epsg3857 => "EPSG:3857",
        };
        write!(f, "{}", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(
            CoordinateSystem::from_code("EPSG:4326").unwrap(),
            CoordinateSystem::Epsg4326
        );
        assert_eq!(
            CoordinateSystem::from_code("epsg:3857").unwrap(),
            CoordinateSystem::Epsg3857
        );
        assert_eq!(
            CoordinateSystem::from_code("CRS:84").unwrap(),
            CoordinateSystem::Epsg4326
        );
        assert!("900913".parse::<CoordinateSystem>().is_err());
        assert!(CoordinateSystem::from_code("EPSG:99999").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for system in [CoordinateSystem::Epsg4326, CoordinateSystem::Epsg3857] {
            let parsed: CoordinateSystem = system.to_string().parse().unwrap();
            assert_eq!(parsed, system);
        }
    }

    #[test]
    fn test_matrix_size() {
        assert_eq!(CoordinateSystem::Epsg3857.matrix_size(0), (1, 1));
        assert_eq!(CoordinateSystem::Epsg3857.matrix_size(3), (8, 8));
        assert_eq!(CoordinateSystem::Epsg4326.matrix_size(0), (2, 1));
        assert_eq!(CoordinateSystem::Epsg4326.matrix_size(10), (2048, 1024));
    }
}

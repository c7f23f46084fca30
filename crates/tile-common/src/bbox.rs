//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, CoordinateSystem, TileError, TileResult};

/// A geographic or projected bounding box given by its two corners.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857), coordinates are in meters.
/// `min` is componentwise less than or equal to `max`, and both corners
/// share one coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl GeoBounds {
    /// Create bounds from raw corner values, ordering each axis.
    pub fn from_corners(
        system: CoordinateSystem,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Self {
        Self {
            min: Coordinate::new(min_x.min(max_x), min_y.min(max_y), system),
            max: Coordinate::new(min_x.max(max_x), min_y.max(max_y), system),
        }
    }

    /// Create bounds spanned by two coordinates of the same system.
    pub fn from_coordinates(a: Coordinate, b: Coordinate) -> TileResult<Self> {
        if a.system != b.system {
            return Err(TileError::geometry(format!(
                "corner coordinates use different systems ({} and {})",
                a.system, b.system
            )));
        }
        Ok(Self::from_corners(a.system, a.x, a.y, b.x, b.y))
    }

    pub fn system(&self) -> CoordinateSystem {
        self.min.system
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Check if this bbox intersects another with a non-zero area.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &GeoBounds) -> Option<GeoBounds> {
        if !self.intersects(other) {
            return None;
        }

        Some(GeoBounds::from_corners(
            self.system(),
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        ))
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Convert both corners to another coordinate system.
    pub fn to_system(&self, system: CoordinateSystem) -> GeoBounds {
        let min = self.min.to_system(system);
        let max = self.max.to_system(system);
        GeoBounds::from_corners(system, min.x, min.y, max.x, max.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_orders_axes() {
        let bbox = GeoBounds::from_corners(CoordinateSystem::Epsg4326, 10.0, 5.0, -10.0, -5.0);
        assert_eq!(bbox.min.x, -10.0);
        assert_eq!(bbox.min.y, -5.0);
        assert_eq!(bbox.max.x, 10.0);
        assert_eq!(bbox.max.y, 5.0);
    }

    #[test]
    fn test_from_coordinates_rejects_mixed_systems() {
        let result = GeoBounds::from_coordinates(
            Coordinate::geodetic(0.0, 0.0),
            Coordinate::mercator(1.0, 1.0),
        );
        assert!(matches!(result, Err(TileError::Geometry(_))));
    }

    #[test]
    fn test_intersection() {
        let sys = CoordinateSystem::Epsg4326;
        let a = GeoBounds::from_corners(sys, 0.0, 0.0, 10.0, 10.0);
        let b = GeoBounds::from_corners(sys, 5.0, 5.0, 15.0, 15.0);
        let c = GeoBounds::from_corners(sys, 20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection.min.x, 5.0);
        assert_eq!(intersection.min.y, 5.0);
        assert_eq!(intersection.max.x, 10.0);
        assert_eq!(intersection.max.y, 10.0);
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let sys = CoordinateSystem::Epsg3857;
        let a = GeoBounds::from_corners(sys, 0.0, 0.0, 10.0, 10.0);
        let b = GeoBounds::from_corners(sys, 10.0, 0.0, 20.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }
}

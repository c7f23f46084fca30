//! Projection-aware coordinates and their pixel-space conversions.
//!
//! A [`Coordinate`] is a single value type tagged with its
//! [`CoordinateSystem`]; the per-projection math is selected by that tag.
//!
//! Pixel space is the global pixel grid of one zoom level with its origin
//! at the bottom-left corner of the world (TMS orientation).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::crs::{CoordinateSystem, GEODETIC_ORIGIN_SHIFT, MERCATOR_ORIGIN_SHIFT};

/// A point in geographic or projected space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude or easting
    pub x: f64,
    /// Latitude or northing
    pub y: f64,
    pub system: CoordinateSystem,
}

/// A position in the global pixel grid of one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PixelCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Units per pixel for a coordinate system at a zoom level.
///
/// Halves with every zoom increment. For EPSG:3857 this is
/// `2 × originShift / tileSize / 2^zoom` (156543.03392804062 at zoom 0 with
/// 256px tiles); the geographic profile puts 180° in one tile row at zoom 0,
/// so it uses `originShift / tileSize / 2^zoom`.
pub fn resolution(system: CoordinateSystem, zoom: u32, tile_size: u32) -> f64 {
    let scale = 2f64.powi(zoom as i32);
    match system {
        CoordinateSystem::Epsg4326 => GEODETIC_ORIGIN_SHIFT / tile_size as f64 / scale,
        CoordinateSystem::Epsg3857 => 2.0 * MERCATOR_ORIGIN_SHIFT / tile_size as f64 / scale,
    }
}

/// Offsets that move the world's bottom-left corner to pixel (0, 0).
fn pixel_origin(system: CoordinateSystem) -> (f64, f64) {
    match system {
        CoordinateSystem::Epsg4326 => (GEODETIC_ORIGIN_SHIFT, GEODETIC_ORIGIN_SHIFT / 2.0),
        CoordinateSystem::Epsg3857 => (MERCATOR_ORIGIN_SHIFT, MERCATOR_ORIGIN_SHIFT),
    }
}

impl Coordinate {
    pub fn new(x: f64, y: f64, system: CoordinateSystem) -> Self {
        Self { x, y, system }
    }

    /// Geographic coordinate from longitude and latitude in degrees.
    pub fn geodetic(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, CoordinateSystem::Epsg4326)
    }

    /// Spherical Mercator coordinate in meters.
    pub fn mercator(x: f64, y: f64) -> Self {
        Self::new(x, y, CoordinateSystem::Epsg3857)
    }

    /// Units per pixel at `zoom` for this coordinate's system.
    pub fn resolution(&self, zoom: u32, tile_size: u32) -> f64 {
        resolution(self.system, zoom, tile_size)
    }

    /// Position of this coordinate in the pixel grid of `zoom`.
    pub fn to_pixel(&self, zoom: u32, tile_size: u32) -> PixelCoordinate {
        let res = self.resolution(zoom, tile_size);
        let (shift_x, shift_y) = pixel_origin(self.system);

        PixelCoordinate {
            x: (self.x + shift_x) / res,
            y: (self.y + shift_y) / res,
        }
    }

    /// Inverse of [`Coordinate::to_pixel`].
    pub fn from_pixel(
        pixel: PixelCoordinate,
        system: CoordinateSystem,
        zoom: u32,
        tile_size: u32,
    ) -> Self {
        let res = resolution(system, zoom, tile_size);
        let (shift_x, shift_y) = pixel_origin(system);

        Self::new(pixel.x * res - shift_x, pixel.y * res - shift_y, system)
    }

    /// Convert to EPSG:4326 using the inverse spherical Mercator transform.
    pub fn to_geodetic(&self) -> Self {
        match self.system {
            CoordinateSystem::Epsg4326 => *self,
            CoordinateSystem::Epsg3857 => {
                let lon = self.x / MERCATOR_ORIGIN_SHIFT * 180.0;
                let lat = self.y / MERCATOR_ORIGIN_SHIFT * 180.0;
                let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
                Self::geodetic(lon, lat)
            }
        }
    }

    /// Convert to EPSG:3857 using the forward spherical Mercator transform.
    pub fn to_mercator(&self) -> Self {
        match self.system {
            CoordinateSystem::Epsg3857 => *self,
            CoordinateSystem::Epsg4326 => {
                let x = self.x * MERCATOR_ORIGIN_SHIFT / 180.0;
                let y = ((90.0 + self.y) * PI / 360.0).tan().ln() / (PI / 180.0);
                Self::mercator(x, y * MERCATOR_ORIGIN_SHIFT / 180.0)
            }
        }
    }

    pub fn to_system(&self, system: CoordinateSystem) -> Self {
        match system {
            CoordinateSystem::Epsg4326 => self.to_geodetic(),
            CoordinateSystem::Epsg3857 => self.to_mercator(),
        }
    }
}

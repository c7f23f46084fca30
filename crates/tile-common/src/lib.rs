//! Common types and utilities shared across the raster tiler crates.
//!
//! Everything in here is pure arithmetic: coordinate conversions, tile
//! numbering for a zoom range, and the small geometry value types the
//! pipeline passes around. No I/O happens in this crate.

pub mod bbox;
pub mod coordinate;
pub mod crs;
pub mod error;
pub mod extension;
pub mod geometry;
pub mod interpolation;
pub mod tile;

pub use bbox::GeoBounds;
pub use coordinate::{resolution, Coordinate, PixelCoordinate};
pub use crs::CoordinateSystem;
pub use error::{TileError, TileResult};
pub use extension::TileExtension;
pub use geometry::{Area, Size, DEFAULT_TILE_SIZE};
pub use interpolation::Interpolation;
pub use tile::{count_tiles, tile_range, TileCoord, TileRange, TileScheme, MAX_ZOOM};

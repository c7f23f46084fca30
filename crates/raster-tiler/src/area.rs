//! Maps a destination tile onto the source raster.
//!
//! For one tile this yields two rectangles: the *read* area in raster pixels
//! and the *write* area inside the tile canvas. When the tile lies fully
//! inside the raster the write area is the whole canvas; when it straddles
//! the raster edge only part of the canvas is covered and the rest stays
//! transparent.
//!
//! ```text
//!   raster                      tile canvas
//!   +-----------------+         +-----------+
//!   |        +-----+  |         |     +-----|
//!   |        |read |  |  ───►   |     |write|
//!   +--------+-----+--+         |     +-----|
//!                               +-----------+
//! ```

use serde::Serialize;

use tile_common::{Area, GeoBounds, PixelCoordinate, Size};

/// Slack in pixels absorbed when an edge lands on a pixel boundary.
const EDGE_EPSILON: f64 = 1e-6;

/// Source and destination rectangles for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileAreas {
    /// Rectangle of source pixels, in the raster's top-down pixel grid.
    pub read: Area,
    /// Rectangle inside the tile canvas the resized source is placed into.
    pub write: Area,
}

impl TileAreas {
    /// Resize factors `(x, y)` from the read area to the write area.
    pub fn scale(&self) -> (f64, f64) {
        (
            self.write.size.width as f64 / self.read.size.width as f64,
            self.write.size.height as f64 / self.read.size.height as f64,
        )
    }

    /// Whether the source covers the whole tile canvas.
    pub fn covers(&self, tile_size: Size) -> bool {
        self.write.origin == PixelCoordinate::default() && self.write.size == tile_size
    }
}

/// Compute read and write areas of a tile against a raster.
///
/// Returns `None` when the tile does not overlap the raster with a non-zero
/// area, or when the two extents are in different coordinate systems.
pub fn compute_areas(
    raster_size: Size,
    raster_bounds: &GeoBounds,
    tile_bounds: &GeoBounds,
    tile_size: Size,
) -> Option<TileAreas> {
    if raster_size.is_empty() || tile_size.is_empty() {
        return None;
    }
    if raster_bounds.system() != tile_bounds.system() {
        return None;
    }

    let clip = raster_bounds.intersection(tile_bounds)?;

    // Raster rows run top-down
    let raster_x = raster_size.width as f64 / raster_bounds.width();
    let raster_y = raster_size.height as f64 / raster_bounds.height();
    let (read_x, read_width) = pixel_span(
        (clip.min.x - raster_bounds.min.x) * raster_x,
        (clip.max.x - raster_bounds.min.x) * raster_x,
        raster_size.width,
    );
    let (read_y, read_height) = pixel_span(
        (raster_bounds.max.y - clip.max.y) * raster_y,
        (raster_bounds.max.y - clip.min.y) * raster_y,
        raster_size.height,
    );

    let tile_x = tile_size.width as f64 / tile_bounds.width();
    let tile_y = tile_size.height as f64 / tile_bounds.height();
    let (write_x, write_width) = pixel_span(
        (clip.min.x - tile_bounds.min.x) * tile_x,
        (clip.max.x - tile_bounds.min.x) * tile_x,
        tile_size.width,
    );
    let (write_y, write_height) = pixel_span(
        (tile_bounds.max.y - clip.max.y) * tile_y,
        (tile_bounds.max.y - clip.min.y) * tile_y,
        tile_size.height,
    );

    Some(TileAreas {
        read: Area::new(
            PixelCoordinate::new(read_x as f64, read_y as f64),
            Size::new(read_width, read_height),
        ),
        write: Area::new(
            PixelCoordinate::new(write_x as f64, write_y as f64),
            Size::new(write_width, write_height),
        ),
    })
}

/// Integer start and length covering `[lo, hi)` inside `[0, limit)`.
///
/// Floors the start and ceils the end so adjacent tiles share their edge
/// pixels; the result is at least one pixel long.
fn pixel_span(lo: f64, hi: f64, limit: u32) -> (u32, u32) {
    let limit = limit as f64;
    let start = (lo + EDGE_EPSILON).floor().clamp(0.0, limit - 1.0);
    let end = (hi - EDGE_EPSILON).ceil().clamp(start + 1.0, limit);
    (start as u32, (end - start) as u32)
}

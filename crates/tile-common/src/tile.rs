//! Tile addresses and tile numbering over a zoom range.
//!
//! Pixel space is bottom-up, so addresses computed from coordinates are TMS
//! addresses first and get flipped when the XYZ scheme is requested:
//! `y_tms = 2^z - 1 - y_xyz`.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::{
    Coordinate, CoordinateSystem, GeoBounds, PixelCoordinate, TileError, TileExtension,
    TileResult,
};

/// Highest zoom level whose matrix fits the `u32` tile indices.
pub const MAX_ZOOM: u32 = 30;

/// Slack, in tile units, absorbed when a coordinate lands on a tile edge.
const INDEX_EPSILON: f64 = 1e-9;

/// Y-axis convention of a tile address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TileScheme {
    /// Origin top-left, Y grows downward (Google/OSM).
    #[default]
    Xyz,
    /// Origin bottom-left, Y grows upward.
    Tms,
}

impl TileScheme {
    pub fn from_tms_flag(use_tms: bool) -> Self {
        if use_tms {
            Self::Tms
        } else {
            Self::Xyz
        }
    }

    pub fn is_tms(&self) -> bool {
        matches!(self, Self::Tms)
    }
}

/// A tile coordinate (z/x/y) together with the Y convention it is in.
///
/// Equality and ordering include the scheme: `xyz(1, 0, 0)` and
/// `tms(1, 0, 0)` are different tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
    pub scheme: TileScheme,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32, scheme: TileScheme) -> Self {
        Self { z, x, y, scheme }
    }

    pub fn xyz(z: u32, x: u32, y: u32) -> Self {
        Self::new(z, x, y, TileScheme::Xyz)
    }

    pub fn tms(z: u32, x: u32, y: u32) -> Self {
        Self::new(z, x, y, TileScheme::Tms)
    }

    /// Check that the address exists in the tile matrix of `system`.
    pub fn check(&self, system: CoordinateSystem) -> TileResult<()> {
        check_zoom(self.z)?;
        let (cols, rows) = system.matrix_size(self.z);
        if self.x >= cols || self.y >= rows {
            return Err(TileError::range(format!(
                "tile {} is outside the {}x{} matrix of zoom {} in {}",
                self.cache_key(),
                cols,
                rows,
                self.z,
                system
            )));
        }
        Ok(())
    }

    /// The same tile expressed in the other Y convention.
    pub fn flip(&self) -> TileCoord {
        let rows = 1u32 << self.z;
        let scheme = match self.scheme {
            TileScheme::Xyz => TileScheme::Tms,
            TileScheme::Tms => TileScheme::Xyz,
        };
        TileCoord {
            z: self.z,
            x: self.x,
            y: rows - 1 - self.y,
            scheme,
        }
    }

    /// The same tile expressed in `scheme`.
    pub fn to_scheme(&self, scheme: TileScheme) -> TileCoord {
        if self.scheme == scheme {
            *self
        } else {
            self.flip()
        }
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Relative output path `{z}/{x}/{y}.{ext}`.
    pub fn path(&self, extension: TileExtension) -> PathBuf {
        PathBuf::from(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.{}", self.y, extension.as_str()))
    }

    /// Get the parent tile (zoom - 1).
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
            scheme: self.scheme,
        })
    }

    /// Get the four children tiles (zoom + 1).
    pub fn children(&self) -> [TileCoord; 4] {
        let x = self.x * 2;
        let y = self.y * 2;
        let z = self.z + 1;
        let scheme = self.scheme;
        [
            TileCoord { z, x, y, scheme },
            TileCoord { z, x: x + 1, y, scheme },
            TileCoord { z, x, y: y + 1, scheme },
            TileCoord {
                z,
                x: x + 1,
                y: y + 1,
                scheme,
            },
        ]
    }

    /// Quadrant this tile occupies inside its parent.
    ///
    /// ```text
    /// 0 1
    /// 2 3
    /// ```
    ///
    /// The TMS table is the XYZ table mirrored vertically, so a tile gets the
    /// same quadrant in both conventions.
    pub fn position(&self) -> u8 {
        let x_odd = self.x % 2 == 1;
        let y_odd = self.y % 2 == 1;

        match (self.scheme, x_odd, y_odd) {
            (TileScheme::Xyz, false, false) => 0,
            (TileScheme::Xyz, true, false) => 1,
            (TileScheme::Xyz, false, true) => 2,
            (TileScheme::Xyz, true, true) => 3,
            (TileScheme::Tms, false, false) => 2,
            (TileScheme::Tms, true, false) => 3,
            (TileScheme::Tms, false, true) => 0,
            (TileScheme::Tms, true, true) => 1,
        }
    }

    /// Geographic extent of this tile in `system`.
    pub fn bounds(&self, system: CoordinateSystem, tile_size: u32) -> GeoBounds {
        let tms = self.to_scheme(TileScheme::Tms);
        let side = tile_size as f64;

        let min_pixel = PixelCoordinate::new(tms.x as f64 * side, tms.y as f64 * side);
        let max_pixel = PixelCoordinate::new((tms.x + 1) as f64 * side, (tms.y + 1) as f64 * side);

        GeoBounds {
            min: Coordinate::from_pixel(min_pixel, system, self.z, tile_size),
            max: Coordinate::from_pixel(max_pixel, system, self.z, tile_size),
        }
    }
}

/// Inclusive rectangle of tile addresses on one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub min: TileCoord,
    pub max: TileCoord,
}

impl TileRange {
    /// Tiles covering `bounds` at `zoom`, clamped to the tile matrix.
    pub fn for_bounds(
        bounds: &GeoBounds,
        zoom: u32,
        tile_size: u32,
        scheme: TileScheme,
    ) -> TileResult<Self> {
        check_zoom(zoom)?;
        if tile_size == 0 {
            return Err(TileError::geometry("tile size must be > 0"));
        }

        let (cols, rows) = bounds.system().matrix_size(zoom);
        let side = tile_size as f64;

        let lo = bounds.min.to_pixel(zoom, tile_size);
        let hi = bounds.max.to_pixel(zoom, tile_size);

        let (min_x, max_x) = index_span(lo.x / side, hi.x / side, cols);
        let (min_y, max_y) = index_span(lo.y / side, hi.y / side, rows);

        let range = match scheme {
            TileScheme::Tms => Self {
                min: TileCoord::tms(zoom, min_x, min_y),
                max: TileCoord::tms(zoom, max_x, max_y),
            },
            TileScheme::Xyz => Self {
                min: TileCoord::xyz(zoom, min_x, rows - 1 - max_y),
                max: TileCoord::xyz(zoom, max_x, rows - 1 - min_y),
            },
        };
        Ok(range)
    }

    pub fn zoom(&self) -> u32 {
        self.min.z
    }

    pub fn scheme(&self) -> TileScheme {
        self.min.scheme
    }

    pub fn columns(&self) -> u32 {
        self.max.x - self.min.x + 1
    }

    pub fn rows(&self) -> u32 {
        self.max.y - self.min.y + 1
    }

    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.z == self.zoom()
            && coord.scheme == self.scheme()
            && (self.min.x..=self.max.x).contains(&coord.x)
            && (self.min.y..=self.max.y).contains(&coord.y)
    }

    /// Addresses in row-major order (ascending row, then ascending column).
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> {
        let range = *self;
        (range.min.y..=range.max.y).flat_map(move |y| {
            (range.min.x..=range.max.x)
                .map(move |x| TileCoord::new(range.zoom(), x, y, range.scheme()))
        })
    }
}

/// Tile address rectangle covering the box spanned by `min` and `max`.
pub fn tile_range(
    min: &Coordinate,
    max: &Coordinate,
    zoom: u32,
    tile_size: u32,
    scheme: TileScheme,
) -> TileResult<TileRange> {
    let bounds = GeoBounds::from_coordinates(*min, *max)?;
    TileRange::for_bounds(&bounds, zoom, tile_size, scheme)
}

/// Total number of tiles covering `bounds` over an inclusive zoom range.
///
/// An empty zoom range counts zero tiles.
pub fn count_tiles(
    bounds: &GeoBounds,
    zooms: RangeInclusive<u32>,
    scheme: TileScheme,
    tile_size: u32,
) -> TileResult<u64> {
    let mut total = 0u64;
    for zoom in zooms {
        total += TileRange::for_bounds(bounds, zoom, tile_size, scheme)?.count();
    }
    Ok(total)
}

fn check_zoom(zoom: u32) -> TileResult<()> {
    if zoom > MAX_ZOOM {
        return Err(TileError::range(format!(
            "zoom {} exceeds maximum {}",
            zoom, MAX_ZOOM
        )));
    }
    Ok(())
}

/// Lower edge floors, upper edge uses `ceil - 1` so a box ending exactly
/// on a tile edge does not pull in the next tile.
fn index_span(lo: f64, hi: f64, count: u32) -> (u32, u32) {
    let last = count as i64 - 1;
    let first = ((lo + INDEX_EPSILON).floor() as i64).clamp(0, last);
    let end = ((hi - INDEX_EPSILON).ceil() as i64 - 1).clamp(0, last);
    (first as u32, end.max(first) as u32)
}

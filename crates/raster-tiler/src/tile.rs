//! The raster tile entity: one tile address, its extent and its payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tile_common::{
    tile_range, Coordinate, CoordinateSystem, GeoBounds, Interpolation, Size, TileCoord, TileError,
    TileExtension, TileResult, TileScheme, DEFAULT_TILE_SIZE,
};

/// Encoded payloads of this size or smaller are treated as empty tiles.
pub const MINIMAL_BYTES_COUNT: usize = 355;

/// Number of bands written to each tile.
///
/// `0` keeps the band layout of the source raster; `1` gray, `2` gray with
/// alpha, `3` RGB, `4` RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct BandCount(u8);

/// RGBA output.
pub const DEFAULT_BAND_COUNT: BandCount = BandCount(4);

impl BandCount {
    /// Keep whatever bands the source raster has.
    pub const SOURCE: BandCount = BandCount(0);

    pub const MAX: u8 = 4;

    pub fn new(count: u8) -> TileResult<Self> {
        Self::try_from(count as i64)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_source(&self) -> bool {
        self.0 == 0
    }

    /// Concrete band count given the source raster's band count.
    pub fn resolve(&self, source_bands: u8) -> u8 {
        if self.is_source() {
            source_bands.clamp(1, Self::MAX)
        } else {
            self.0
        }
    }
}

impl Default for BandCount {
    fn default() -> Self {
        DEFAULT_BAND_COUNT
    }
}

impl TryFrom<i64> for BandCount {
    type Error = TileError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if !(0..=Self::MAX as i64).contains(&value) {
            return Err(TileError::range(format!(
                "band count {} is outside 0..={}",
                value,
                Self::MAX
            )));
        }
        Ok(Self(value as u8))
    }
}

impl From<BandCount> for i64 {
    fn from(count: BandCount) -> Self {
        count.0 as i64
    }
}

impl FromStr for BandCount {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| TileError::range(format!("band count '{}' is not an integer", s)))?;
        Self::try_from(value)
    }
}

impl fmt::Display for BandCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional settings for a new [`RasterTile`].
#[derive(Debug, Clone, PartialEq)]
pub struct TileOptions {
    /// Must be square.
    pub size: Size,
    pub bytes: Option<Bytes>,
    pub extension: TileExtension,
    pub band_count: BandCount,
    pub interpolation: Interpolation,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_TILE_SIZE,
            bytes: None,
            extension: TileExtension::default(),
            band_count: BandCount::default(),
            interpolation: Interpolation::default(),
        }
    }
}

/// A tile cut from a raster.
///
/// The geographic extent is always derived from the address and never set
/// directly.
#[derive(Debug, Clone)]
pub struct RasterTile {
    coord: TileCoord,
    system: CoordinateSystem,
    bounds: GeoBounds,
    size: Size,
    bytes: Option<Bytes>,
    path: Option<PathBuf>,
    extension: TileExtension,
    band_count: BandCount,
    interpolation: Interpolation,
    minimal_bytes: usize,
}

impl RasterTile {
    /// Create a tile for an address.
    pub fn new(
        coord: TileCoord,
        system: CoordinateSystem,
        options: TileOptions,
    ) -> TileResult<Self> {
        check_size(options.size)?;
        coord.check(system)?;

        Ok(Self {
            coord,
            system,
            bounds: coord.bounds(system, options.size.width),
            size: options.size,
            bytes: options.bytes,
            path: None,
            extension: options.extension,
            band_count: options.band_count,
            interpolation: options.interpolation,
            minimal_bytes: MINIMAL_BYTES_COUNT,
        })
    }

    /// Create the tile whose extent contains both coordinates at `zoom`.
    ///
    /// Fails with a geometry error when the pair spans more than one tile.
    pub fn from_coordinates(
        min: &Coordinate,
        max: &Coordinate,
        zoom: u32,
        scheme: TileScheme,
        options: TileOptions,
    ) -> TileResult<Self> {
        check_size(options.size)?;

        let range = tile_range(min, max, zoom, options.size.width, scheme)?;
        if range.count() != 1 {
            return Err(TileError::geometry(format!(
                "coordinates span {} tiles at zoom {}, expected exactly one",
                range.count(),
                zoom
            )));
        }

        Self::new(range.min, min.system, options)
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    pub fn min_coordinate(&self) -> Coordinate {
        self.bounds.min
    }

    pub fn max_coordinate(&self) -> Coordinate {
        self.bounds.max
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_tms(&self) -> bool {
        self.coord.scheme.is_tms()
    }

    pub fn extension(&self) -> TileExtension {
        self.extension
    }

    pub fn band_count(&self) -> BandCount {
        self.band_count
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Quadrant of this tile inside its parent, see [`TileCoord::position`].
    pub fn position(&self) -> u8 {
        self.coord.position()
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    pub fn set_bytes(&mut self, bytes: impl Into<Bytes>) {
        self.bytes = Some(bytes.into());
    }

    /// Move the payload out of the tile.
    pub fn take_bytes(&mut self) -> Option<Bytes> {
        self.bytes.take()
    }

    /// Release the payload.
    pub fn clear(&mut self) {
        self.bytes = None;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn minimal_bytes(&self) -> usize {
        self.minimal_bytes
    }

    pub fn set_minimal_bytes(&mut self, minimal_bytes: usize) {
        self.minimal_bytes = minimal_bytes;
    }

    /// Check the payload against this tile's minimal byte count.
    pub fn validate(&self, check_path: bool) -> bool {
        self.validate_with(check_path, self.minimal_bytes)
    }

    /// A payload of `minimal_bytes` or fewer bytes is invalid. With
    /// `check_path` the tile must also point at an existing file.
    pub fn validate_with(&self, check_path: bool, minimal_bytes: usize) -> bool {
        let Some(bytes) = &self.bytes else {
            return false;
        };
        if bytes.len() <= minimal_bytes {
            return false;
        }
        if check_path {
            return self.path.as_deref().is_some_and(Path::is_file);
        }
        true
    }
}

fn check_size(size: Size) -> TileResult<()> {
    if !size.is_square() {
        return Err(TileError::geometry(format!("tile size {} is not square", size)));
    }
    if size.is_empty() {
        return Err(TileError::geometry("tile size must be > 0"));
    }
    Ok(())
}

//! Configuration for tile generation.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use tile_common::{Interpolation, Size, TileExtension, TileScheme, MAX_ZOOM};

use crate::imaging::TileEncoding;
use crate::tile::{BandCount, TileOptions};

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default WebP quality (0-100).
/// WebP is more efficient than JPEG, so a slightly lower quality still looks good.
pub const DEFAULT_WEBP_QUALITY: f32 = 85.0;

/// Configuration for one pyramid generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilerConfig {
    /// Lowest zoom level generated.
    pub min_zoom: u32,

    /// Highest zoom level generated (inclusive).
    pub max_zoom: u32,

    /// Y-axis convention of the produced addresses.
    pub scheme: TileScheme,

    /// Side of the square tiles in pixels.
    pub tile_size: u32,

    /// Output image format.
    pub extension: TileExtension,

    /// Resampling filter for the crop/resize step.
    pub interpolation: Interpolation,

    /// Bands written to each tile.
    pub band_count: BandCount,

    /// Number of decoded source blocks kept in memory.
    pub cache_tile_count: usize,

    /// Worker threads (0 = one per available core).
    pub worker_count: usize,

    /// Log an estimate of the remaining time while generating.
    pub print_estimated_time: bool,

    pub jpeg_quality: u8,

    pub webp_quality: f32,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 0,
            scheme: TileScheme::Xyz,
            tile_size: 256,
            extension: TileExtension::Png,
            interpolation: Interpolation::Cubic,
            band_count: BandCount::default(),
            cache_tile_count: 1000,
            worker_count: 0,
            print_estimated_time: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            webp_quality: DEFAULT_WEBP_QUALITY,
        }
    }
}

impl TilerConfig {
    /// Config for a zoom range with every other setting at its default.
    pub fn for_zooms(min_zoom: u32, max_zoom: u32) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables keep their default value.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TILER_MIN_ZOOM") {
            if let Ok(zoom) = val.parse() {
                config.min_zoom = zoom;
            }
        }

        if let Ok(val) = std::env::var("TILER_MAX_ZOOM") {
            if let Ok(zoom) = val.parse() {
                config.max_zoom = zoom;
            }
        }

        if let Ok(val) = std::env::var("TILER_TMS") {
            config.scheme = TileScheme::from_tms_flag(val.to_lowercase() == "true" || val == "1");
        }

        if let Ok(val) = std::env::var("TILER_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("TILER_EXTENSION") {
            if let Ok(extension) = val.parse() {
                config.extension = extension;
            }
        }

        if let Ok(val) = std::env::var("TILER_INTERPOLATION") {
            if let Ok(interpolation) = val.parse() {
                config.interpolation = interpolation;
            }
        }

        if let Ok(val) = std::env::var("TILER_BAND_COUNT") {
            if let Ok(bands) = val.parse() {
                config.band_count = bands;
            }
        }

        if let Ok(val) = std::env::var("TILER_CACHE_TILES") {
            if let Ok(count) = val.parse() {
                config.cache_tile_count = count;
            }
        }

        if let Ok(val) = std::env::var("TILER_WORKERS") {
            if let Ok(count) = val.parse() {
                config.worker_count = count;
            }
        }

        if let Ok(val) = std::env::var("TILER_PRINT_ETA") {
            config.print_estimated_time = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("JPEG_QUALITY") {
            if let Ok(quality) = val.parse::<u8>() {
                config.jpeg_quality = quality.min(100);
            }
        }

        if let Ok(val) = std::env::var("WEBP_QUALITY") {
            if let Ok(quality) = val.parse::<f32>() {
                config.webp_quality = quality.clamp(0.0, 100.0);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must be <= max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(format!("max_zoom must be <= {}", MAX_ZOOM));
        }

        if self.tile_size == 0 {
            return Err("tile_size must be > 0".to_string());
        }

        if self.cache_tile_count == 0 {
            return Err("cache_tile_count must be > 0".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be 1-100".to_string());
        }

        if !(0.0..=100.0).contains(&self.webp_quality) {
            return Err("webp_quality must be 0-100".to_string());
        }

        Ok(())
    }

    pub fn zooms(&self) -> RangeInclusive<u32> {
        self.min_zoom..=self.max_zoom
    }

    pub fn tile_dimensions(&self) -> Size {
        Size::square(self.tile_size)
    }

    /// Options for tiles created under this configuration.
    pub fn tile_options(&self) -> TileOptions {
        TileOptions {
            size: self.tile_dimensions(),
            bytes: None,
            extension: self.extension,
            band_count: self.band_count,
            interpolation: self.interpolation,
        }
    }

    pub fn encoding(&self) -> TileEncoding {
        TileEncoding {
            extension: self.extension,
            jpeg_quality: self.jpeg_quality,
            webp_quality: self.webp_quality,
        }
    }
}

//! Tile rendering: crop, resize, place and encode.
//!
//! Every tile is rendered in four steps:
//!
//! 1. Read the source window from the block cache as RGBA8.
//! 2. Resize it to the write area with the configured filter.
//! 3. Place it into a fully transparent canvas of the tile size.
//! 4. Reduce to the requested band count and encode.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageOutputFormat, Rgb, RgbImage, RgbaImage};
use tracing::trace;

use tile_common::{Interpolation, TileExtension};

use crate::area::TileAreas;
use crate::cache::SourceCache;
use crate::error::{TilerError, TilerResult};
use crate::raster::Raster;
use crate::tile::RasterTile;

/// Encoder settings shared by every tile of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileEncoding {
    pub extension: TileExtension,
    pub jpeg_quality: u8,
    pub webp_quality: f32,
}

impl Default for TileEncoding {
    fn default() -> Self {
        Self {
            extension: TileExtension::Png,
            jpeg_quality: crate::config::DEFAULT_JPEG_QUALITY,
            webp_quality: crate::config::DEFAULT_WEBP_QUALITY,
        }
    }
}

/// Map a named interpolation onto an `image` resize filter.
pub fn filter_type(interpolation: Interpolation) -> FilterType {
    match interpolation {
        Interpolation::Nearest => FilterType::Nearest,
        Interpolation::Linear => FilterType::Triangle,
        Interpolation::Cubic => FilterType::CatmullRom,
        Interpolation::Gaussian => FilterType::Gaussian,
        Interpolation::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Render the pixels of `tile` and return the encoded image.
pub fn render_tile(
    cache: &SourceCache,
    raster: &Raster,
    areas: &TileAreas,
    tile: &RasterTile,
    encoding: &TileEncoding,
) -> TilerResult<Vec<u8>> {
    let size = tile.size();
    let region = cache.read_region(raster, &areas.read)?;

    let write = areas.write.size;
    let resized = if region.dimensions() == (write.width, write.height) {
        region
    } else {
        imageops::resize(
            &region,
            write.width,
            write.height,
            filter_type(tile.interpolation()),
        )
    };

    let mut canvas = RgbaImage::new(size.width, size.height);
    imageops::replace(
        &mut canvas,
        &resized,
        areas.write.x() as i64,
        areas.write.y() as i64,
    );

    let bands = tile.band_count().resolve(raster.band_count());
    trace!(
        tile = %tile.coord().cache_key(),
        read = %areas.read.size,
        write = %write,
        bands,
        "Rendered tile"
    );

    encode(canvas, bands, encoding)
}

/// Encode an RGBA canvas reduced to `bands` bands.
pub fn encode(canvas: RgbaImage, bands: u8, encoding: &TileEncoding) -> TilerResult<Vec<u8>> {
    match encoding.extension {
        TileExtension::Png => encode_png(with_bands(canvas, bands)),
        TileExtension::Jpg => encode_jpeg(&canvas, bands, encoding.jpeg_quality),
        TileExtension::Webp => Ok(encode_webp(with_bands(canvas, bands), encoding.webp_quality)),
    }
}

fn with_bands(canvas: RgbaImage, bands: u8) -> DynamicImage {
    let image = DynamicImage::ImageRgba8(canvas);
    match bands {
        1 => DynamicImage::ImageLuma8(image.to_luma8()),
        2 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        3 => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    }
}

fn encode_png(image: DynamicImage) -> TilerResult<Vec<u8>> {
    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)?;
    Ok(data)
}

/// JPEG has no alpha: composite onto white first.
fn encode_jpeg(canvas: &RgbaImage, bands: u8, quality: u8) -> TilerResult<Vec<u8>> {
    let flat = flatten_on_white(canvas);
    let (width, height) = flat.dimensions();

    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100));
    if bands <= 2 {
        let gray = DynamicImage::ImageRgb8(flat).to_luma8();
        encoder.encode(&gray, width, height, ColorType::L8)?;
    } else {
        encoder.encode(&flat, width, height, ColorType::Rgb8)?;
    }
    Ok(data)
}

fn flatten_on_white(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// WebP carries RGB or RGBA only, so gray tiles are expanded.
fn encode_webp(image: DynamicImage, quality: f32) -> Vec<u8> {
    let (width, height) = (image.width(), image.height());
    let quality = quality.clamp(0.0, 100.0);
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height)
            .encode(quality)
            .to_vec()
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height)
            .encode(quality)
            .to_vec()
    }
}

/// Decode an encoded tile back into pixels.
pub fn decode_tile(data: &[u8]) -> TilerResult<DynamicImage> {
    if !data.starts_with(b"RIFF") {
        return Ok(image::load_from_memory(data)?);
    }

    let decoded = webp::Decoder::new(data)
        .decode()
        .ok_or_else(|| TilerError::imaging("cannot decode WebP tile"))?;
    let (width, height) = (decoded.width(), decoded.height());
    let pixels = decoded.to_vec();
    let image = if decoded.is_alpha() {
        RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
    } else {
        RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
    };
    image.ok_or_else(|| TilerError::imaging("WebP tile has the wrong buffer length"))
}

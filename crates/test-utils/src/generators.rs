//! Test data generators for synthetic rasters.
//!
//! Pixel buffers are deterministic for a given seed so tile output can be
//! compared across runs. Noisy content is used on purpose: flat images
//! compress to tiny PNGs that fall below the tile validation threshold.

use std::io::Cursor;

use tiff::encoder::colortype::{Gray8, RGB8, RGBA8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// GeoTIFF Tag IDs (not in standard tiff crate)
const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
const GEOTIFF_MODELTIEPOINT: u16 = 33922;
const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Placement of a synthetic raster: top-left corner plus pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georeference {
    /// EPSG code written to the GeoKey directory (4326 or 3857).
    pub epsg: u16,
    /// X of the top-left corner.
    pub origin_x: f64,
    /// Y of the top-left corner.
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl Georeference {
    /// Georeference that stretches `width × height` pixels over `bbox`
    /// given as `(min_x, min_y, max_x, max_y)`.
    pub fn from_bbox(epsg: u16, bbox: (f64, f64, f64, f64), width: u32, height: u32) -> Self {
        let (min_x, min_y, max_x, max_y) = bbox;
        Self {
            epsg,
            origin_x: min_x,
            origin_y: max_y,
            pixel_width: (max_x - min_x) / width as f64,
            pixel_height: (max_y - min_y) / height as f64,
        }
    }
}

/// Creates an RGBA buffer of deterministic noise, fully opaque.
///
/// # Example
///
/// ```
/// use test_utils::create_noise_rgba_pixels;
///
/// let pixels = create_noise_rgba_pixels(8, 4, 42);
/// assert_eq!(pixels.len(), 8 * 4 * 4);
/// assert!(pixels.chunks_exact(4).all(|px| px[3] == 255));
/// ```
pub fn create_noise_rgba_pixels(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col, row, seed);
            pixels.extend_from_slice(&[hash as u8, (hash >> 8) as u8, (hash >> 16) as u8, 255]);
        }
    }
    pixels
}

/// Creates an RGB buffer of deterministic noise.
pub fn create_noise_rgb_pixels(width: u32, height: u32, seed: u32) -> Vec<u8> {
    create_noise_rgba_pixels(width, height, seed)
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}

/// Creates a single band of deterministic noise.
pub fn create_noise_gray_pixels(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        for col in 0..width {
            pixels.push(simple_hash(col, row, seed) as u8);
        }
    }
    pixels
}

/// Simple hash function for deterministic pseudo-random generation.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Encodes an 8-bit RGBA buffer as an in-memory GeoTIFF.
pub fn create_geotiff_rgba(width: u32, height: u32, pixels: &[u8], geo: Georeference) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("Failed to create TIFF encoder");
        let mut image = encoder
            .new_image::<RGBA8>(width, height)
            .expect("Failed to start TIFF image");
        write_geotiff_tags(image.encoder(), &geo);
        image.write_data(pixels).expect("Failed to write TIFF data");
    }
    buf.into_inner()
}

/// Encodes an 8-bit RGB buffer as an in-memory GeoTIFF.
pub fn create_geotiff_rgb(width: u32, height: u32, pixels: &[u8], geo: Georeference) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("Failed to create TIFF encoder");
        let mut image = encoder
            .new_image::<RGB8>(width, height)
            .expect("Failed to start TIFF image");
        write_geotiff_tags(image.encoder(), &geo);
        image.write_data(pixels).expect("Failed to write TIFF data");
    }
    buf.into_inner()
}

/// Encodes an 8-bit grayscale buffer as an in-memory GeoTIFF.
pub fn create_geotiff_gray(width: u32, height: u32, pixels: &[u8], geo: Georeference) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("Failed to create TIFF encoder");
        let mut image = encoder
            .new_image::<Gray8>(width, height)
            .expect("Failed to start TIFF image");
        write_geotiff_tags(image.encoder(), &geo);
        image.write_data(pixels).expect("Failed to write TIFF data");
    }
    buf.into_inner()
}

/// Encodes a plain TIFF with no georeferencing tags.
pub fn create_plain_tiff_rgba(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("Failed to create TIFF encoder");
        encoder
            .write_image::<RGBA8>(width, height, pixels)
            .expect("Failed to write TIFF image");
    }
    buf.into_inner()
}

/// Noisy RGBA GeoTIFF covering the whole geographic world (EPSG:4326).
///
/// A 2:1 raster of `2n × n` pixels lines up with the geographic tile
/// matrix, which is two tiles wide at zoom 0.
pub fn create_world_geotiff(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let pixels = create_noise_rgba_pixels(width, height, seed);
    let geo = Georeference::from_bbox(4326, crate::fixtures::bbox::GLOBAL, width, height);
    create_geotiff_rgba(width, height, &pixels, geo)
}

fn write_geotiff_tags<W, K>(dir: &mut tiff::encoder::DirectoryEncoder<W, K>, geo: &Georeference)
where
    W: std::io::Write + std::io::Seek,
    K: tiff::encoder::TiffKind,
{
    // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
    let pixel_scale = [geo.pixel_width, geo.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), pixel_scale.as_slice())
        .expect("Failed to write ModelPixelScale");

    // ModelTiepoint: pixel (0, 0) -> (origin_x, origin_y)
    let tiepoint = [0.0, 0.0, 0.0, geo.origin_x, geo.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), tiepoint.as_slice())
        .expect("Failed to write ModelTiepoint");

    let geographic = geo.epsg == 4326;
    let mut keys: Vec<u16> = vec![1, 1, 0, 3];
    keys.extend_from_slice(&[
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        if geographic {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        },
    ]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
    if geographic {
        keys.extend_from_slice(&[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, geo.epsg]);
    } else {
        keys.extend_from_slice(&[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, geo.epsg]);
    }
    dir.write_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY), keys.as_slice())
        .expect("Failed to write GeoKeyDirectory");
}

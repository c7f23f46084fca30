//! Georeference metadata of source rasters.
//!
//! GeoTIFF places a raster either with a pixel scale plus a tie point, or
//! with a full affine transformation matrix. Only north-up rasters are
//! supported; rotated or sheared transformations are rejected.

use std::io::Cursor;

use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::debug;

use tile_common::{CoordinateSystem, GeoBounds, Size};

use crate::error::{TilerError, TilerResult};

// GeoKey IDs
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// Source of the geographic extent of a raster.
pub trait GeoReferenceReader: Send + Sync {
    /// Extent of a `size` raster encoded in `data`, in `system` units.
    fn read_bounds(
        &self,
        data: &[u8],
        size: Size,
        system: CoordinateSystem,
    ) -> TilerResult<GeoBounds>;
}

/// Reads the GeoTIFF model tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffReader;

impl GeoTiffReader {
    /// Coordinate system declared in the GeoKey directory, if it is one
    /// this crate can tile.
    pub fn read_system(&self, data: &[u8]) -> TilerResult<Option<CoordinateSystem>> {
        let mut decoder = Decoder::new(Cursor::new(data))?;
        let Ok(keys) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) else {
            return Ok(None);
        };

        // Header is 4 shorts, then 4 shorts per key
        for entry in keys.get(4..).unwrap_or_default().chunks_exact(4) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            if location != 0 {
                continue;
            }
            if key == GEOGRAPHIC_TYPE_GEO_KEY || key == PROJECTED_CS_TYPE_GEO_KEY {
                return Ok(CoordinateSystem::from_code(&value.to_string()).ok());
            }
        }
        Ok(None)
    }
}

impl GeoReferenceReader for GeoTiffReader {
    fn read_bounds(
        &self,
        data: &[u8],
        size: Size,
        system: CoordinateSystem,
    ) -> TilerResult<GeoBounds> {
        let mut decoder = Decoder::new(Cursor::new(data))?;
        let width = size.width as f64;
        let height = size.height as f64;

        if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
            if matrix.len() < 8 {
                return Err(TilerError::metadata("ModelTransformation has fewer than 8 values"));
            }
            let (a, b, d) = (matrix[0], matrix[1], matrix[3]);
            let (e, f, h) = (matrix[4], matrix[5], matrix[7]);
            if b != 0.0 || e != 0.0 {
                return Err(TilerError::metadata("rotated rasters are not supported"));
            }
            debug!(origin_x = d, origin_y = h, scale_x = a, scale_y = f, "Read ModelTransformation");
            return Ok(GeoBounds::from_corners(
                system,
                d,
                h,
                d + a * width,
                h + f * height,
            ));
        }

        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .map_err(|_| TilerError::metadata("raster has no ModelPixelScale tag"))?;
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .map_err(|_| TilerError::metadata("raster has no ModelTiepoint tag"))?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(TilerError::metadata("truncated georeference tags"));
        }

        let (scale_x, scale_y) = (scale[0], scale[1]);
        if scale_x <= 0.0 || scale_y <= 0.0 {
            return Err(TilerError::metadata(format!(
                "invalid pixel scale ({}, {})",
                scale_x, scale_y
            )));
        }

        // Tie point maps raster (i, j) to model (x, y)
        let origin_x = tiepoint[3] - tiepoint[0] * scale_x;
        let origin_y = tiepoint[4] + tiepoint[1] * scale_y;
        debug!(origin_x, origin_y, scale_x, scale_y, "Read ModelTiepoint");

        Ok(GeoBounds::from_corners(
            system,
            origin_x,
            origin_y - scale_y * height,
            origin_x + scale_x * width,
            origin_y,
        ))
    }
}

/// Caller-supplied extent, for rasters without georeference tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBounds(pub GeoBounds);

impl GeoReferenceReader for FixedBounds {
    fn read_bounds(
        &self,
        _data: &[u8],
        _size: Size,
        system: CoordinateSystem,
    ) -> TilerResult<GeoBounds> {
        if self.0.system() != system {
            return Err(TilerError::metadata(format!(
                "fixed bounds are in {}, raster is in {}",
                self.0.system(),
                system
            )));
        }
        Ok(self.0)
    }
}

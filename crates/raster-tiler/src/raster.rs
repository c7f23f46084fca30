//! Decoded source raster with its georeference.

use std::io::Read;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use tile_common::{CoordinateSystem, GeoBounds, Size};

use crate::error::{TilerError, TilerResult};
use crate::metadata::{GeoReferenceReader, GeoTiffReader};

/// A georeferenced source image.
///
/// Owns the decoded pixels; released when dropped or closed. Not `Clone`:
/// share it behind an `Arc` when several tasks need it.
pub struct Raster {
    image: DynamicImage,
    size: Size,
    bounds: GeoBounds,
    source: String,
}

impl Raster {
    /// Open a GeoTIFF file.
    pub fn open(path: impl AsRef<Path>, system: CoordinateSystem) -> TilerResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| TilerError::input(format!("cannot read {}: {}", path.display(), e)))?;
        Self::decode(&data, system, &GeoTiffReader, path.display().to_string())
    }

    /// Decode a GeoTIFF held in memory.
    pub fn from_bytes(data: &[u8], system: CoordinateSystem) -> TilerResult<Self> {
        Self::decode(data, system, &GeoTiffReader, "<memory>".to_string())
    }

    /// Decode a GeoTIFF from any reader.
    pub fn from_reader<R: Read>(mut reader: R, system: CoordinateSystem) -> TilerResult<Self> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| TilerError::input(format!("cannot read raster stream: {}", e)))?;
        Self::decode(&data, system, &GeoTiffReader, "<stream>".to_string())
    }

    /// Decode any image format `image` understands, taking the extent from
    /// `georeference`.
    pub fn decode(
        data: &[u8],
        system: CoordinateSystem,
        georeference: &dyn GeoReferenceReader,
        source: String,
    ) -> TilerResult<Self> {
        let image = image::load_from_memory(data)
            .map_err(|e| TilerError::input(format!("cannot decode {}: {}", source, e)))?;
        let size = Size::new(image.width(), image.height());
        let bounds = georeference.read_bounds(data, size, system)?;
        Self::from_image(image, bounds, source)
    }

    /// Wrap an already decoded image.
    pub fn from_image(
        image: DynamicImage,
        bounds: GeoBounds,
        source: impl Into<String>,
    ) -> TilerResult<Self> {
        let source = source.into();
        let size = Size::new(image.width(), image.height());
        if size.is_empty() {
            return Err(TilerError::input(format!("{} has no pixels", source)));
        }
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(TilerError::input(format!(
                "{} has an empty extent ({} x {})",
                source,
                bounds.width(),
                bounds.height()
            )));
        }

        info!(
            source = %source,
            size = %size,
            bands = image.color().channel_count(),
            system = %bounds.system(),
            min_x = bounds.min.x,
            min_y = bounds.min.y,
            max_x = bounds.max.x,
            max_y = bounds.max.y,
            "Opened raster"
        );

        Ok(Self {
            image,
            size,
            bounds,
            source,
        })
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    pub fn system(&self) -> CoordinateSystem {
        self.bounds.system()
    }

    /// Label of where the raster came from (path or `<memory>`).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of bands in the decoded image.
    pub fn band_count(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Release the raster now.
    pub fn close(self) {}
}

impl Drop for Raster {
    fn drop(&mut self) {
        debug!(source = %self.source, "Releasing raster");
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("source", &self.source)
            .field("size", &self.size)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FixedBounds;
    use test_utils::{
        create_geotiff_gray, create_noise_gray_pixels, create_noise_rgba_pixels,
        create_plain_tiff_rgba, create_world_geotiff, fixtures, temp_test_dir, write_test_file,
        Georeference,
    };

    #[test]
    fn test_open_from_path() {
        let dir = temp_test_dir();
        let path = write_test_file(&dir, "world.tif", &create_world_geotiff(64, 32, 1));

        let raster = Raster::open(&path, CoordinateSystem::Epsg4326).unwrap();
        assert_eq!(raster.size(), Size::new(64, 32));
        assert_eq!(raster.system(), CoordinateSystem::Epsg4326);
        assert_eq!(raster.band_count(), 4);
        assert!(raster.source().ends_with("world.tif"));
        raster.close();
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let result = Raster::open("/definitely/not/here.tif", CoordinateSystem::Epsg4326);
        assert!(matches!(result, Err(TilerError::Input(_))));
    }

    #[test]
    fn test_garbage_bytes_are_input_error() {
        let result = Raster::from_bytes(b"not an image", CoordinateSystem::Epsg4326);
        assert!(matches!(result, Err(TilerError::Input(_))));
    }

    #[test]
    fn test_from_reader() {
        let bytes = create_world_geotiff(32, 16, 2);
        let raster = Raster::from_reader(std::io::Cursor::new(bytes), CoordinateSystem::Epsg4326)
            .unwrap();
        assert_eq!(raster.size(), Size::new(32, 16));
        assert_eq!(raster.source(), "<stream>");
    }

    #[test]
    fn test_gray_raster_band_count() {
        let geo = Georeference::from_bbox(4326, fixtures::bbox::EAST, 16, 16);
        let bytes = create_geotiff_gray(16, 16, &create_noise_gray_pixels(16, 16, 5), geo);
        let raster = Raster::from_bytes(&bytes, CoordinateSystem::Epsg4326).unwrap();
        assert_eq!(raster.band_count(), 1);
        assert_eq!(raster.bounds().min.x, 0.0);
    }

    #[test]
    fn test_plain_tiff_with_fixed_bounds() {
        let pixels = create_noise_rgba_pixels(8, 8, 1);
        let bytes = create_plain_tiff_rgba(8, 8, &pixels);

        assert!(matches!(
            Raster::from_bytes(&bytes, CoordinateSystem::Epsg4326),
            Err(TilerError::Metadata(_))
        ));

        let bounds = GeoBounds::from_corners(CoordinateSystem::Epsg4326, 10.0, 10.0, 20.0, 20.0);
        let raster = Raster::decode(
            &bytes,
            CoordinateSystem::Epsg4326,
            &FixedBounds(bounds),
            "plain".to_string(),
        )
        .unwrap();
        assert_eq!(raster.bounds(), &bounds);
    }

    #[test]
    fn test_empty_extent_is_rejected() {
        let image = DynamicImage::new_rgba8(4, 4);
        let bounds = GeoBounds::from_corners(CoordinateSystem::Epsg4326, 1.0, 1.0, 1.0, 5.0);
        assert!(matches!(
            Raster::from_image(image, bounds, "flat"),
            Err(TilerError::Input(_))
        ));
    }
}

//! Common test fixtures for raster tiler tests.
//!
//! This module provides pre-defined bounds and raster shapes that show up
//! across the test suite.

/// Common bounding box definitions for testing, as `(min_x, min_y, max_x, max_y)`.
pub mod bbox {
    /// Global geographic bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Whole spherical Mercator square, in meters
    pub const MERCATOR_WORLD: (f64, f64, f64, f64) = (
        -20037508.342789244,
        -20037508.342789244,
        20037508.342789244,
        20037508.342789244,
    );

    /// Eastern hemisphere, one zoom 0 geographic tile
    pub const EAST: (f64, f64, f64, f64) = (0.0, -90.0, 180.0, 90.0);

    /// Around Tokyo, crossing several zoom 10 tile edges
    pub const TOKYO: (f64, f64, f64, f64) = (139.5, 35.4, 140.2, 35.9);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);
}

/// Well-known tile addresses.
pub mod tiles {
    /// Geographic XYZ tile containing Tokyo at zoom 10: `(x, y, z)`.
    pub const TOKYO_Z10: (u32, u32, u32) = (1819, 309, 10);

    /// A point inside [`TOKYO_Z10`] as `(lon, lat)`.
    pub const TOKYO_POINT: (f64, f64) = (139.839478, 35.652832);
}

/// Raster shapes used by pipeline tests.
pub mod raster {
    /// World raster that maps exactly onto the zoom 1 geographic matrix
    pub const WORLD_512X256: RasterSpec = RasterSpec {
        width: 512,
        height: 256,
        bbox: super::bbox::GLOBAL,
    };

    /// Small world raster, upsampled at every zoom
    pub const WORLD_64X32: RasterSpec = RasterSpec {
        width: 64,
        height: 32,
        bbox: super::bbox::GLOBAL,
    };

    /// Specification for a synthetic raster.
    #[derive(Debug, Clone, Copy)]
    pub struct RasterSpec {
        pub width: u32,
        pub height: u32,
        pub bbox: (f64, f64, f64, f64),
    }

    impl RasterSpec {
        /// Total number of pixels.
        pub fn size(&self) -> usize {
            self.width as usize * self.height as usize
        }

        /// Pixel size in coordinate units `(x, y)`.
        pub fn resolution(&self) -> (f64, f64) {
            let (min_x, min_y, max_x, max_y) = self.bbox;
            (
                (max_x - min_x) / self.width as f64,
                (max_y - min_y) / self.height as f64,
            )
        }
    }
}

/// Common CRS codes.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";

    /// CRS:84 (lon/lat order WGS84)
    pub const CRS_84: &str = "CRS:84";
}

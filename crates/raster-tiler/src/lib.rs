//! Georeferenced raster to tile pyramid.
//!
//! Cuts a GeoTIFF (or any decoded image with a known extent) into square
//! tiles over a range of zoom levels, addressed in the XYZ or TMS scheme,
//! for the Web Mercator (EPSG:3857) and geographic (EPSG:4326) profiles.
//!
//! # Architecture
//!
//! ```text
//! Raster::open(path)
//!      │
//!      ▼
//! TilePipeline::new(&raster, config)
//!      │
//!      ├─► for each zoom, for each row (sequential)
//!      │         │
//!      │         └─► columns in parallel (rayon)
//!      │                   │
//!      │                   ├─► compute_areas(tile)    ── None: skipped
//!      │                   ├─► SourceCache::read_region (LRU blocks)
//!      │                   ├─► resize + place on transparent canvas
//!      │                   └─► encode png / jpg / webp
//!      │
//!      └─► TileSink: directory, buffer, queue or async stream
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_tiler::{Raster, TilePipeline, TilerConfig};
//! use tile_common::CoordinateSystem;
//!
//! let raster = Raster::open("world.tif", CoordinateSystem::Epsg4326)?;
//! let pipeline = TilePipeline::new(&raster, TilerConfig::for_zooms(0, 5))?;
//! let report = pipeline.write_to_directory("tiles")?;
//! println!("{} tiles written", report.produced);
//! ```

pub mod area;
pub mod cache;
pub mod config;
pub mod error;
pub mod imaging;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod sink;
pub mod stream;
pub mod tile;

// Re-export commonly used types at crate root
pub use area::{compute_areas, TileAreas};
pub use cache::{CacheStats, SourceCache};
pub use config::{TilerConfig, DEFAULT_JPEG_QUALITY, DEFAULT_WEBP_QUALITY};
pub use error::{TilerError, TilerResult};
pub use imaging::{decode_tile, filter_type, render_tile, TileEncoding};
pub use metadata::{FixedBounds, GeoReferenceReader, GeoTiffReader};
pub use pipeline::{GenerationReport, TilePipeline, Tiles};
pub use progress::{estimate_remaining, ProgressReceiver, ProgressTracker};
pub use raster::Raster;
pub use sink::{BufferSink, DirectorySink, QueueSink, TileSink};
pub use stream::{spawn_tile_stream, TileStream};
pub use tile::{BandCount, RasterTile, TileOptions, DEFAULT_BAND_COUNT, MINIMAL_BYTES_COUNT};

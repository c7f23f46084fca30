//! Pyramid traversal.
//!
//! Zoom levels are generated in ascending order and rows of a level one
//! after another. The columns of a row are rendered in parallel on a
//! dedicated rayon pool; every finished tile is handed to a [`TileSink`].
//!
//! All bulk entry points (`write_to_directory`, `collect`, `send_to`) share
//! [`TilePipeline::run`]. [`TilePipeline::tiles`] walks the same addresses
//! lazily on the calling thread.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tile_common::{TileCoord, TileError, TileRange};

use crate::area::compute_areas;
use crate::cache::{CacheStats, SourceCache};
use crate::config::TilerConfig;
use crate::error::{TilerError, TilerResult};
use crate::imaging::{render_tile, TileEncoding};
use crate::progress::{ProgressReceiver, ProgressTracker};
use crate::raster::Raster;
use crate::sink::{BufferSink, DirectorySink, QueueSink, TileSink};
use crate::tile::RasterTile;

/// Outcome counts of one generation run.
///
/// `total` is the number of addresses visited; every one of them ends up
/// produced, skipped (no overlap with the raster) or dropped by the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub total: u64,
    pub produced: u64,
    pub skipped: u64,
    pub dropped: u64,
}

/// Cuts one raster into a tile pyramid.
pub struct TilePipeline<'r> {
    raster: &'r Raster,
    config: TilerConfig,
    cache: SourceCache,
    encoding: TileEncoding,
    progress: Option<ProgressReceiver>,
    cancel: CancellationToken,
}

impl<'r> TilePipeline<'r> {
    /// Create a pipeline; fails if the configuration is invalid.
    pub fn new(raster: &'r Raster, config: TilerConfig) -> TilerResult<Self> {
        config.validate().map_err(TilerError::Config)?;
        Ok(Self {
            raster,
            cache: SourceCache::new(config.cache_tile_count, config.tile_size),
            encoding: config.encoding(),
            config,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress(mut self, receiver: ProgressReceiver) -> Self {
        self.progress = Some(receiver);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this pipeline when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &TilerConfig {
        &self.config
    }

    pub fn raster(&self) -> &Raster {
        self.raster
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Address range of every configured zoom level.
    pub fn ranges(&self) -> TilerResult<Vec<TileRange>> {
        self.config
            .zooms()
            .map(|zoom| {
                TileRange::for_bounds(
                    self.raster.bounds(),
                    zoom,
                    self.config.tile_size,
                    self.config.scheme,
                )
                .map_err(TilerError::from)
            })
            .collect()
    }

    /// Number of addresses a run visits.
    pub fn count(&self) -> TilerResult<u64> {
        Ok(self.ranges()?.iter().map(TileRange::count).sum())
    }

    /// Render every tile of the pyramid into `sink`.
    pub fn run(&self, sink: &dyn TileSink) -> TilerResult<GenerationReport> {
        let ranges = self.ranges()?;
        let total: u64 = ranges.iter().map(TileRange::count).sum();
        let progress = ProgressTracker::new(
            total,
            self.progress.clone(),
            self.config.print_estimated_time,
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count)
            .thread_name(|i| format!("tiler-worker-{}", i))
            .build()
            .map_err(|e| TilerError::Worker(format!("cannot start worker pool: {}", e)))?;

        info!(
            source = %self.raster.source(),
            min_zoom = self.config.min_zoom,
            max_zoom = self.config.max_zoom,
            scheme = ?self.config.scheme,
            total,
            workers = pool.current_num_threads(),
            "Starting tile generation"
        );

        let produced = AtomicU64::new(0);
        let skipped = AtomicU64::new(0);
        let dropped = AtomicU64::new(0);

        for range in &ranges {
            debug!(
                zoom = range.zoom(),
                columns = range.columns(),
                rows = range.rows(),
                "Generating zoom level"
            );

            for y in range.min.y..=range.max.y {
                if self.cancel.is_cancelled() {
                    return Err(TilerError::Cancelled);
                }

                pool.install(|| {
                    (range.min.x..=range.max.x)
                        .into_par_iter()
                        .try_for_each(|x| -> TilerResult<()> {
                            if self.cancel.is_cancelled() {
                                return Err(TilerError::Cancelled);
                            }
                            let coord = TileCoord::new(range.zoom(), x, y, range.scheme());
                            let counter = match self.render(coord)? {
                                None => &skipped,
                                Some(tile) => {
                                    if sink.accept(tile)? {
                                        &produced
                                    } else {
                                        &dropped
                                    }
                                }
                            };
                            counter.fetch_add(1, Ordering::Relaxed);
                            progress.tick();
                            Ok(())
                        })
                })?;
            }
        }

        let report = GenerationReport {
            total,
            produced: produced.into_inner(),
            skipped: skipped.into_inner(),
            dropped: dropped.into_inner(),
        };
        let stats = self.cache.stats();
        info!(
            produced = report.produced,
            skipped = report.skipped,
            dropped = report.dropped,
            elapsed_ms = progress.elapsed().as_millis() as u64,
            cache_hit_rate = stats.hit_rate(),
            "Tile generation complete"
        );
        Ok(report)
    }

    /// Write the pyramid as `{root}/{z}/{x}/{y}.{ext}`.
    pub fn write_to_directory(&self, root: impl AsRef<Path>) -> TilerResult<GenerationReport> {
        self.run(&DirectorySink::new(root.as_ref()))
    }

    /// Render the pyramid into memory, ordered by address.
    pub fn collect(&self) -> TilerResult<(Vec<RasterTile>, GenerationReport)> {
        let sink = BufferSink::new();
        let report = self.run(&sink)?;
        Ok((sink.into_tiles(), report))
    }

    /// Push valid tiles into `sender`; invalid ones count as dropped.
    pub fn send_to(&self, sender: UnboundedSender<RasterTile>) -> TilerResult<GenerationReport> {
        self.run(&QueueSink::new(sender))
    }

    /// Lazily render tiles in address order on the calling thread.
    ///
    /// Tiles failing `validate(false)` are dropped like in the queue sink.
    /// Iteration stops after the first error.
    pub fn tiles(&self) -> Tiles<'_, 'r> {
        let (coords, pending, total): (Box<dyn Iterator<Item = TileCoord>>, _, _) =
            match self.ranges() {
                Ok(ranges) => {
                    let total = ranges.iter().map(TileRange::count).sum();
                    (
                        Box::new(ranges.into_iter().flat_map(|range| range.iter())),
                        None,
                        total,
                    )
                }
                Err(e) => (Box::new(std::iter::empty()), Some(e), 0),
            };

        Tiles {
            pipeline: self,
            coords,
            pending,
            progress: ProgressTracker::new(
                total,
                self.progress.clone(),
                self.config.print_estimated_time,
            ),
            finished: false,
        }
    }

    /// Render a single tile and return its encoded bytes; fails with
    /// `Validation` when the payload is below the size threshold.
    pub fn tile_bytes(&self, coord: TileCoord) -> TilerResult<Bytes> {
        let mut tile = self.render(coord)?.ok_or_else(|| {
            TileError::geometry(format!(
                "tile {} does not overlap {}",
                coord.cache_key(),
                self.raster.source()
            ))
        })?;
        if !tile.validate(false) {
            return Err(TilerError::Validation(format!(
                "tile {} is empty or below the size threshold",
                coord.cache_key()
            )));
        }
        tile.take_bytes()
            .ok_or_else(|| TilerError::imaging("rendered tile has no payload"))
    }

    /// Build and render one tile; `None` when it misses the raster.
    fn render(&self, coord: TileCoord) -> TilerResult<Option<RasterTile>> {
        let mut tile = RasterTile::new(coord, self.raster.system(), self.config.tile_options())?;
        let Some(areas) = compute_areas(
            self.raster.size(),
            self.raster.bounds(),
            tile.bounds(),
            tile.size(),
        ) else {
            return Ok(None);
        };

        let data = render_tile(&self.cache, self.raster, &areas, &tile, &self.encoding)?;
        tile.set_bytes(data);
        Ok(Some(tile))
    }
}

impl std::fmt::Debug for TilePipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilePipeline")
            .field("raster", &self.raster)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Lazy, sequential tile iterator returned by [`TilePipeline::tiles`].
pub struct Tiles<'p, 'r> {
    pipeline: &'p TilePipeline<'r>,
    coords: Box<dyn Iterator<Item = TileCoord>>,
    pending: Option<TilerError>,
    progress: ProgressTracker,
    finished: bool,
}

impl Iterator for Tiles<'_, '_> {
    type Item = TilerResult<RasterTile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(err) = self.pending.take() {
            self.finished = true;
            return Some(Err(err));
        }

        loop {
            if self.pipeline.cancel.is_cancelled() {
                self.finished = true;
                return Some(Err(TilerError::Cancelled));
            }
            let Some(coord) = self.coords.next() else {
                self.finished = true;
                return None;
            };

            let result = self.pipeline.render(coord);
            self.progress.tick();
            match result {
                Ok(Some(tile)) => {
                    if tile.validate(false) {
                        return Some(Ok(tile));
                    }
                    debug!(tile = %coord.cache_key(), "Dropping tile below the size threshold");
                }
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

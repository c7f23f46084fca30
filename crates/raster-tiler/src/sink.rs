//! Destinations for finished tiles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::{TilerError, TilerResult};
use crate::tile::RasterTile;

/// Receives rendered tiles from the pipeline.
///
/// Called from worker threads, possibly concurrently. Returns `Ok(true)` when
/// the tile was kept and `Ok(false)` when it was dropped.
pub trait TileSink: Send + Sync {
    fn accept(&self, tile: RasterTile) -> TilerResult<bool>;
}

/// Writes tiles as `{root}/{z}/{x}/{y}.{ext}` files.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a tile ends up under this sink's root.
    pub fn tile_path(&self, tile: &RasterTile) -> PathBuf {
        self.root.join(tile.coord().path(tile.extension()))
    }
}

impl TileSink for DirectorySink {
    fn accept(&self, mut tile: RasterTile) -> TilerResult<bool> {
        if !tile.validate(false) {
            return Err(TilerError::Validation(format!(
                "tile {} has {} bytes, needs more than {}",
                tile.coord().cache_key(),
                tile.bytes().map_or(0, |b| b.len()),
                tile.minimal_bytes()
            )));
        }

        let path = self.tile_path(&tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TilerError::io_at(parent, e))?;
        }
        let bytes = tile.take_bytes().unwrap_or_default();
        fs::write(&path, &bytes).map_err(|e| TilerError::io_at(&path, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote tile");
        tile.set_path(path);
        Ok(true)
    }
}

/// Collects tiles in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    tiles: Mutex<Vec<RasterTile>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().map_or(0, |tiles| tiles.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collected tiles ordered by zoom, column, then row.
    pub fn into_tiles(self) -> Vec<RasterTile> {
        let mut tiles = self
            .tiles
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tiles.sort_by_key(|tile| tile.coord());
        tiles
    }
}

impl TileSink for BufferSink {
    fn accept(&self, tile: RasterTile) -> TilerResult<bool> {
        if !tile.validate(false) {
            return Err(TilerError::Validation(format!(
                "tile {} has no usable payload",
                tile.coord().cache_key()
            )));
        }
        self.tiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tile);
        Ok(true)
    }
}

/// Pushes valid tiles into a channel; invalid ones are dropped.
#[derive(Debug, Clone)]
pub struct QueueSink {
    sender: UnboundedSender<RasterTile>,
}

impl QueueSink {
    pub fn new(sender: UnboundedSender<RasterTile>) -> Self {
        Self { sender }
    }
}

impl TileSink for QueueSink {
    fn accept(&self, tile: RasterTile) -> TilerResult<bool> {
        if !tile.validate(false) {
            debug!(tile = %tile.coord().cache_key(), "Dropping tile below the size threshold");
            return Ok(false);
        }
        self.sender
            .send(tile)
            .map_err(|_| TilerError::QueueClosed)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileOptions;
    use tile_common::{CoordinateSystem, TileCoord};

    fn tile_with(coord: TileCoord, len: usize) -> RasterTile {
        let mut tile =
            RasterTile::new(coord, CoordinateSystem::Epsg4326, TileOptions::default()).unwrap();
        tile.set_bytes(vec![7u8; len]);
        tile
    }

    #[test]
    fn test_directory_sink_writes_layout() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        assert!(sink.accept(tile_with(TileCoord::xyz(2, 3, 1), 400)).unwrap());
        let path = dir.path().join("2").join("3").join("1.png");
        assert_eq!(std::fs::read(&path).unwrap().len(), 400);
    }

    #[test]
    fn test_directory_sink_rejects_small_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let result = sink.accept(tile_with(TileCoord::xyz(0, 0, 0), 355));
        assert!(matches!(result, Err(TilerError::Validation(_))));
        assert!(!dir.path().join("0").exists());
    }

    #[test]
    fn test_buffer_sink_sorts() {
        let sink = BufferSink::new();
        sink.accept(tile_with(TileCoord::xyz(1, 1, 0), 500)).unwrap();
        sink.accept(tile_with(TileCoord::xyz(0, 0, 0), 500)).unwrap();
        sink.accept(tile_with(TileCoord::xyz(1, 0, 1), 500)).unwrap();
        assert_eq!(sink.len(), 3);

        let coords: Vec<_> = sink.into_tiles().iter().map(|t| t.coord()).collect();
        assert_eq!(
            coords,
            vec![
                TileCoord::xyz(0, 0, 0),
                TileCoord::xyz(1, 0, 1),
                TileCoord::xyz(1, 1, 0)
            ]
        );
    }

    #[test]
    fn test_queue_sink_drops_invalid() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = QueueSink::new(tx);

        assert!(!sink.accept(tile_with(TileCoord::xyz(0, 0, 0), 10)).unwrap());
        assert!(sink.accept(tile_with(TileCoord::xyz(0, 1, 0), 1000)).unwrap());
        assert_eq!(rx.try_recv().unwrap().coord(), TileCoord::xyz(0, 1, 0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_queue_sink_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = QueueSink::new(tx);
        assert!(matches!(
            sink.accept(tile_with(TileCoord::xyz(0, 0, 0), 1000)),
            Err(TilerError::QueueClosed)
        ));
    }
}

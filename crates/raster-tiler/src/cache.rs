//! LRU cache of decoded source blocks.
//!
//! The raster is split into square blocks that are converted to RGBA8 on
//! first use. Neighbouring tiles read overlapping source windows, so keeping
//! recently used blocks avoids converting the same pixels again.

use image::RgbaImage;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tile_common::Area;

use crate::error::{TilerError, TilerResult};
use crate::raster::Raster;

/// Cache key for blocks: (block column, block row).
pub type BlockKey = (u32, u32);

/// Statistics for the block cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded, thread-safe cache of RGBA8 source blocks.
pub struct SourceCache {
    blocks: Mutex<LruCache<BlockKey, Arc<RgbaImage>>>,
    block_size: u32,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SourceCache {
    /// Create a cache holding at most `capacity` blocks of `block_size²` pixels.
    pub fn new(capacity: usize, block_size: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            blocks: Mutex::new(LruCache::new(capacity)),
            block_size: block_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<BlockKey, Arc<RgbaImage>>> {
        self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a block, converting it from the raster on a miss.
    fn block(&self, raster: &Raster, key: BlockKey) -> Arc<RgbaImage> {
        if let Some(block) = self.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(block);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Convert outside the lock
        let size = raster.size();
        let x = key.0 * self.block_size;
        let y = key.1 * self.block_size;
        let width = self.block_size.min(size.width - x);
        let height = self.block_size.min(size.height - y);
        let block = Arc::new(raster.image().crop_imm(x, y, width, height).into_rgba8());

        if let Some((evicted, _)) = self.lock().push(key, Arc::clone(&block)) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        block
    }

    /// Read a rectangle of source pixels as RGBA8.
    pub fn read_region(&self, raster: &Raster, area: &Area) -> TilerResult<RgbaImage> {
        let (x, y) = (area.x(), area.y());
        let (width, height) = (area.size.width, area.size.height);
        let size = raster.size();

        if area.is_empty() || x + width > size.width || y + height > size.height {
            return Err(TilerError::imaging(format!(
                "region {}x{} at ({}, {}) is outside the {} raster",
                width, height, x, y, size
            )));
        }

        let bs = self.block_size;
        let mut buf = vec![0u8; width as usize * height as usize * 4];

        for block_row in (y / bs)..=((y + height - 1) / bs) {
            for block_col in (x / bs)..=((x + width - 1) / bs) {
                let block = self.block(raster, (block_col, block_row));
                let block_x = block_col * bs;
                let block_y = block_row * bs;

                // Overlap of the block and the region, in raster pixels
                let x0 = x.max(block_x);
                let y0 = y.max(block_y);
                let x1 = (x + width).min(block_x + block.width());
                let y1 = (y + height).min(block_y + block.height());
                let len = (x1 - x0) as usize * 4;

                let src = block.as_raw();
                for row in y0..y1 {
                    let s = ((row - block_y) as usize * block.width() as usize
                        + (x0 - block_x) as usize)
                        * 4;
                    let d = ((row - y) as usize * width as usize + (x0 - x) as usize) * 4;
                    buf[d..d + len].copy_from_slice(&src[s..s + len]);
                }
            }
        }

        RgbaImage::from_raw(width, height, buf)
            .ok_or_else(|| TilerError::imaging("region buffer has the wrong length"))
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use tile_common::{CoordinateSystem, PixelCoordinate, Size};

    fn numbered_raster(width: u32, height: u32) -> Raster {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([x as u8, y as u8, (x + y) as u8, 255])
        });
        let bounds = CoordinateSystem::Epsg4326.valid_bounds();
        Raster::from_image(DynamicImage::ImageRgba8(image), bounds, "numbered").unwrap()
    }

    fn area(x: u32, y: u32, width: u32, height: u32) -> Area {
        Area::new(PixelCoordinate::new(x as f64, y as f64), Size::new(width, height))
    }

    #[test]
    fn test_read_region_across_blocks() {
        let raster = numbered_raster(40, 30);
        let cache = SourceCache::new(16, 16);

        let region = cache.read_region(&raster, &area(10, 5, 20, 20)).unwrap();
        assert_eq!(region.dimensions(), (20, 20));
        for (px, py, pixel) in region.enumerate_pixels() {
            let (x, y) = (px + 10, py + 5);
            assert_eq!(pixel.0, [x as u8, y as u8, (x + y) as u8, 255]);
        }
        // Region touches 2x2 blocks
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_edge_blocks_are_partial() {
        let raster = numbered_raster(40, 30);
        let cache = SourceCache::new(16, 16);
        let region = cache.read_region(&raster, &area(32, 16, 8, 14)).unwrap();
        assert_eq!(region.get_pixel(7, 13).0, [39, 29, 68, 255]);
    }

    #[test]
    fn test_cache_hits_on_reread() {
        let raster = numbered_raster(32, 32);
        let cache = SourceCache::new(16, 16);

        cache.read_region(&raster, &area(0, 0, 8, 8)).unwrap();
        cache.read_region(&raster, &area(4, 4, 8, 8)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let raster = numbered_raster(64, 16);
        let cache = SourceCache::new(2, 16);

        // Touch four blocks with room for two
        cache.read_region(&raster, &area(0, 0, 64, 16)).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_region_outside_raster() {
        let raster = numbered_raster(16, 16);
        let cache = SourceCache::new(4, 16);
        assert!(matches!(
            cache.read_region(&raster, &area(10, 0, 10, 4)),
            Err(TilerError::Imaging(_))
        ));
        assert!(cache.read_region(&raster, &area(0, 0, 0, 4)).is_err());
    }
}

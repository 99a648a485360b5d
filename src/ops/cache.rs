//! Tile memoization.
//!
//! Caches upstream tiles so that shared or expensive sub-graphs are computed
//! once per tile. The cache sits in the graph like any other operator and
//! is transparent to consumers.

use crate::core::context::RenderContext;
use crate::core::error::RasterResult;
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::{Raster, RasterMut};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of tiles kept.
pub const DEFAULT_CACHE_TILES: usize = 64;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of tiles evicted.
    pub evictions: u64,
}

impl TileCacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Memoizes the tiles of its source in an LRU cache.
///
/// Bounds and tile grid equal the source's. Only successfully computed tiles
/// are stored, so an interrupted render leaves the cache consistent.
pub struct TileCacheOp {
    base: OperatorBase,
    source: RenderedRef,
    tiles: Mutex<LruCache<(i32, i32), Raster>>,
    stats: Mutex<TileCacheStats>,
}

impl TileCacheOp {
    /// Cache up to `capacity` tiles of `source`. A zero capacity falls back
    /// to [`DEFAULT_CACHE_TILES`].
    pub fn new(source: RenderedRef, capacity: usize) -> RasterResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_TILES))
            .unwrap_or(NonZeroUsize::MIN);
        let base = OperatorBase::derived("cache", Arc::clone(&source), source.bounds(), source.tile_grid())?;
        log::debug!("tile cache {} of {} holding {} tile(s)", base.id(), source.id(), capacity);
        Ok(Self {
            base,
            source,
            tiles: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(TileCacheStats::default()),
        })
    }

    /// The cached node.
    pub fn source(&self) -> &RenderedRef {
        &self.source
    }

    /// Get cache statistics.
    pub fn stats(&self) -> TileCacheStats {
        *self.stats.lock()
    }

    /// Get number of cached tiles.
    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a single tile.
    pub fn invalidate(&self, tx: i32, ty: i32) {
        self.tiles.lock().pop(&(tx, ty));
    }

    /// Drop every cached tile.
    pub fn clear(&self) {
        self.tiles.lock().clear();
    }
}

impl std::fmt::Debug for TileCacheOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCacheOp")
            .field("base", &self.base)
            .field("cached", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl RenderedImage for TileCacheOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn tile(&self, tx: i32, ty: i32, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_tile();
        self.base.tile_bounds(tx, ty)?;

        if let Some(tile) = self.tiles.lock().get(&(tx, ty)) {
            self.stats.lock().hits += 1;
            return Ok(tile.clone());
        }
        self.stats.lock().misses += 1;

        // The lock is not held while computing: the source may be slow, and
        // other threads may want other tiles meanwhile.
        let tile = self.source.tile(tx, ty, ctx)?;

        let mut tiles = self.tiles.lock();
        if let Some(((ex, ey), _)) = tiles.push((tx, ty), tile.clone()) {
            if (ex, ey) != (tx, ty) {
                self.stats.lock().evictions += 1;
                log::trace!("tile cache {} evicted ({}, {})", self.id(), ex, ey);
            }
        }
        Ok(tile)
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        let Some(area) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };
        for (tx, ty) in self.tile_grid().tiles_in(&area) {
            let tile = self.tile(tx, ty, ctx)?;
            dest.set_rect(&tile)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RasterError;
    use crate::core::geometry::Rect;
    use crate::core::layout::SampleLayout;
    use crate::ops::point::PointOp;
    use crate::ops::source::RasterSource;

    fn expensive() -> RenderedRef {
        let raster = Raster::filled(Rect::new(0, 0, 16, 16), SampleLayout::GRAY, &[3]).unwrap();
        let src: RenderedRef = Arc::new(RasterSource::with_tile_size(raster, 8, 8).unwrap());
        Arc::new(PointOp::invert(src).unwrap())
    }

    #[test]
    fn test_hits_after_first_fetch() {
        let cache = TileCacheOp::new(expensive(), 8).unwrap();
        let ctx = RenderContext::new();
        let first = cache.tile(1, 0, &ctx).unwrap();
        let second = cache.tile(1, 0, &ctx).unwrap();
        assert!(first.shares_storage(&second));
        assert_eq!(cache.stats(), TileCacheStats { hits: 1, misses: 1, evictions: 0 });
        assert_eq!(cache.stats().hit_ratio(), 0.5);
    }

    #[test]
    fn test_region_served_from_tiles() {
        let cache = TileCacheOp::new(expensive(), 8).unwrap();
        let ctx = RenderContext::new();
        let data = cache.data_region(Rect::new(4, 4, 8, 8), &ctx).unwrap();
        assert!(data.to_vec().iter().all(|&s| s == 252));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_eviction() {
        let cache = TileCacheOp::new(expensive(), 2).unwrap();
        let ctx = RenderContext::new();
        for (tx, ty) in cache.tile_range() {
            cache.tile(tx, ty, &ctx).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_interrupted_fetch_not_cached() {
        let cache = TileCacheOp::new(expensive(), 8).unwrap();
        let ctx = RenderContext::new();
        ctx.cancel();
        assert!(matches!(cache.tile(0, 0, &ctx), Err(RasterError::Interrupted)));
        assert!(cache.is_empty());

        let fresh = RenderContext::new();
        assert!(cache.tile(0, 0, &fresh).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = TileCacheOp::new(expensive(), 8).unwrap();
        let ctx = RenderContext::new();
        cache.tile(0, 0, &ctx).unwrap();
        cache.tile(1, 1, &ctx).unwrap();
        cache.invalidate(0, 0);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}

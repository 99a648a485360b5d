//! Rendering driver.
//!
//! Pulls the tiles of a root node that cover a region and assembles them
//! into one raster. Tiles are independent, so they can be fetched on the
//! rayon pool; the output buffer is the only shared state.

use crate::config::RenderConfig;
use crate::core::context::{FetchStats, RenderContext};
use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::node::RenderedImage;
use crate::core::raster::{Raster, WritableRaster};
use crate::execution::progress::{ProgressCallback, ProgressTracker, RenderProgress};
use image::RgbaImage;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Render options.
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Fetch tiles in parallel.
    pub parallel: bool,
    /// Maximum number of parallel threads (0 = use all available).
    pub max_threads: usize,
    /// Progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("parallel", &self.parallel)
            .field("max_threads", &self.max_threads)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl RenderOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable parallel rendering.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set maximum threads.
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(RenderProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self::new()
            .with_parallel(config.parallel)
            .with_max_threads(config.max_threads)
    }
}

/// Render statistics.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    /// Tiles fetched from the root.
    pub tiles: usize,
    /// Pixels in the output.
    pub pixels: u64,
    /// Wall-clock time.
    pub duration: Duration,
    /// Context counters after the render.
    pub fetch: FetchStats,
}

/// Result of a render.
#[derive(Debug)]
pub struct RenderOutput {
    /// Pixels of the rendered region.
    pub raster: Raster,
    /// Render statistics.
    pub stats: RenderStats,
}

impl RenderOutput {
    /// Convert the output to 8-bit RGBA.
    pub fn to_rgba_image(&self) -> RgbaImage {
        to_rgba_image(&self.raster)
    }

    /// Encode the output as an image file; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> RasterResult<()> {
        self.to_rgba_image().save(path.as_ref())?;
        log::info!("wrote {}", path.as_ref().display());
        Ok(())
    }
}

/// Convert a 1-4 band raster to 8-bit RGBA.
pub fn to_rgba_image(raster: &Raster) -> RgbaImage {
    raster.to_rgba_image()
}

/// Tile-parallel renderer.
#[derive(Debug, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Create a renderer with default options (sequential).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with options.
    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `region` of `root`, or all of it when `region` is `None`.
    ///
    /// The region is clipped to the root's bounds; a region that misses the
    /// root entirely fails with [`RasterError::RegionOutOfBounds`].
    pub fn render(
        &self,
        root: &dyn RenderedImage,
        region: Option<Rect>,
        ctx: &RenderContext,
    ) -> RasterResult<RenderOutput> {
        let start_time = Instant::now();
        let bounds = root.bounds();
        let area = match region {
            Some(region) => bounds
                .intersection(&region)
                .ok_or(RasterError::RegionOutOfBounds { region, bounds })?,
            None => bounds,
        };

        let tiles: Vec<(i32, i32)> = root.tile_grid().tiles_in(&area).iter().collect();
        log::info!(
            "rendering {} {} over {} in {} tile(s){}",
            root.kind(),
            root.id(),
            area,
            tiles.len(),
            if self.options.parallel { " in parallel" } else { "" }
        );

        let tracker = ProgressTracker::start(tiles.len(), self.options.progress_callback.clone());
        let output = Mutex::new(WritableRaster::new(area, root.sample_layout())?);

        let render_tile = |&(tx, ty): &(i32, i32)| -> RasterResult<()> {
            ctx.check_interrupted()?;
            let tile = root.tile(tx, ty, ctx)?;
            output.lock().as_mut().set_rect(&tile)?;
            tracker.tile_completed(tx, ty);
            Ok(())
        };

        let result = if self.options.parallel {
            self.run_parallel(&tiles, &render_tile)
        } else {
            tiles.iter().try_for_each(&render_tile)
        };

        if let Err(err) = result {
            if err.is_interruption() {
                log::warn!(
                    "render of {} interrupted after {}/{} tile(s)",
                    root.id(),
                    tracker.completed(),
                    tiles.len()
                );
                tracker.cancelled();
            } else {
                log::error!("render of {} failed: {}", root.id(), err);
                tracker.report_error(None, err.to_string());
            }
            return Err(err);
        }

        tracker.complete();
        let stats = RenderStats {
            tiles: tracker.completed(),
            pixels: area.area(),
            duration: start_time.elapsed(),
            fetch: ctx.stats(),
        };
        log::info!(
            "rendered {} pixel(s) from {} tile(s) in {:?}",
            stats.pixels,
            stats.tiles,
            stats.duration
        );

        Ok(RenderOutput {
            raster: output.into_inner().into_raster(),
            stats,
        })
    }

    fn run_parallel<F>(&self, tiles: &[(i32, i32)], render_tile: &F) -> RasterResult<()>
    where
        F: Fn(&(i32, i32)) -> RasterResult<()> + Sync,
    {
        if self.options.max_threads == 0 {
            return tiles.par_iter().try_for_each(render_tile);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_threads)
            .build()
            .map_err(|e| RasterError::invalid(format!("cannot start render pool: {}", e)))?;
        pool.install(|| tiles.par_iter().try_for_each(render_tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::CancelToken;
    use crate::core::layout::SampleLayout;
    use crate::core::node::RenderedRef;
    use crate::ops::{PointOp, RasterSource, TranslateOp};

    fn ramp() -> RenderedRef {
        let bounds = Rect::new(0, 0, 20, 12);
        let data = (0..bounds.area()).map(|i| (i % 251) as u8).collect();
        let raster = Raster::new(bounds, SampleLayout::GRAY, data).unwrap();
        Arc::new(RasterSource::with_tile_size(raster, 8, 8).unwrap())
    }

    #[test]
    fn test_render_whole_image() {
        let root = ramp();
        let ctx = RenderContext::new();
        let out = Renderer::new().render(root.as_ref(), None, &ctx).unwrap();
        assert_eq!(out.raster.bounds(), root.bounds());
        assert!(out.raster.samples_equal(&root.data(&ctx).unwrap()));
        assert_eq!(out.stats.tiles, 6);
        assert_eq!(out.stats.pixels, 240);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let src = ramp();
        let root: RenderedRef = Arc::new(TranslateOp::new(src, -7, 30).unwrap());
        let region = Some(Rect::new(-5, 31, 12, 9));

        let seq = Renderer::new()
            .render(root.as_ref(), region, &RenderContext::new())
            .unwrap();
        let par = Renderer::with_options(RenderOptions::new().with_parallel(true).with_max_threads(2))
            .render(root.as_ref(), region, &RenderContext::new())
            .unwrap();

        assert_eq!(seq.raster.bounds(), Rect::new(-5, 31, 12, 9));
        assert!(seq.raster.samples_equal(&par.raster));
        assert!(seq
            .raster
            .samples_equal(&root.data_region(Rect::new(-5, 31, 12, 9), &RenderContext::new()).unwrap()));
    }

    #[test]
    fn test_region_outside_root() {
        let root = ramp();
        let err = Renderer::new()
            .render(root.as_ref(), Some(Rect::new(100, 100, 4, 4)), &RenderContext::new())
            .unwrap_err();
        assert!(matches!(err, RasterError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_cancelled_render() {
        let token = CancelToken::new();
        token.cancel();
        let ctx = RenderContext::with_cancel_token(token);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let renderer = Renderer::with_options(
            RenderOptions::new()
                .with_parallel(true)
                .with_progress(move |e| sink.lock().push(e)),
        );

        let root: RenderedRef = Arc::new(PointOp::invert(ramp()).unwrap());
        let err = renderer.render(root.as_ref(), None, &ctx).unwrap_err();
        assert!(err.is_interruption());
        assert!(events.lock().contains(&RenderProgress::Cancelled));
    }

    #[test]
    fn test_progress_reports_every_tile() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let renderer = Renderer::with_options(RenderOptions::new().with_progress(move |e| sink.lock().push(e)));
        renderer.render(ramp().as_ref(), None, &RenderContext::new()).unwrap();

        let events = events.lock();
        let done = events
            .iter()
            .filter(|e| matches!(e, RenderProgress::TileCompleted { .. }))
            .count();
        assert_eq!(done, 6);
        assert!(matches!(
            events.last(),
            Some(RenderProgress::Completed { tiles_rendered: 6, .. })
        ));
    }

    #[test]
    fn test_save_png() {
        let root = ramp();
        let out = Renderer::new().render(root.as_ref(), None, &RenderContext::new()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        out.save(&path).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), (20, 12));
        assert_eq!(reloaded.get_pixel(3, 1).0, [23, 23, 23, 255]);
    }

    #[test]
    fn test_options_from_config() {
        let config = RenderConfig::new().with_parallel(false).with_max_threads(5);
        let options = RenderOptions::from(&config);
        assert!(!options.parallel);
        assert_eq!(options.max_threads, 5);
    }
}

//! Leaf node serving pixels from an in-memory raster.

use crate::core::context::RenderContext;
use crate::core::error::RasterResult;
use crate::core::geometry::Rect;
use crate::core::grid::{TileGrid, DEFAULT_TILE_SIZE};
use crate::core::layout::{ColorModel, SampleLayout};
use crate::core::node::{OperatorBase, RenderedImage};
use crate::core::property::{PropertyValue, SOURCE_BOUNDS};
use crate::core::raster::{Raster, RasterMut};
use image::DynamicImage;
use std::path::Path;

/// A leaf that owns a raster and hands out views of it.
///
/// Tiles and regions are sub-views of the stored raster, so reads never copy
/// samples.
#[derive(Debug)]
pub struct RasterSource {
    base: OperatorBase,
    raster: Raster,
}

impl RasterSource {
    /// Serve `raster` with the default tile size and color model.
    pub fn new(raster: Raster) -> RasterResult<Self> {
        Self::with_tile_size(raster, DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }

    /// Serve `raster` with an explicit tile size. The grid is anchored at the
    /// raster's minimum corner.
    pub fn with_tile_size(raster: Raster, tile_width: i32, tile_height: i32) -> RasterResult<Self> {
        let color_model = ColorModel::default_for(raster.layout());
        Self::with_color_model(raster, color_model, tile_width, tile_height)
    }

    /// Serve `raster` with an explicit color model and tile size.
    pub fn with_color_model(
        raster: Raster,
        color_model: ColorModel,
        tile_width: i32,
        tile_height: i32,
    ) -> RasterResult<Self> {
        let bounds = raster.bounds();
        let grid = TileGrid::anchored(&bounds, tile_width, tile_height)?;
        let base = OperatorBase::leaf("raster", bounds, raster.layout(), color_model, grid)?
            .with_property(SOURCE_BOUNDS, PropertyValue::Rect(bounds));
        log::debug!("raster source {} bounds {} grid {:?}", base.id(), bounds, grid);
        Ok(Self { base, raster })
    }

    /// A source where every pixel holds `samples`.
    pub fn filled(bounds: Rect, layout: SampleLayout, samples: &[u8]) -> RasterResult<Self> {
        Self::new(Raster::filled(bounds, layout, samples)?)
    }

    /// Wrap a decoded image with its top-left pixel at `(x, y)`.
    pub fn from_image(image: &DynamicImage, x: i32, y: i32) -> RasterResult<Self> {
        Self::new(Raster::from_image(image, x, y)?)
    }

    /// Decode an image file and place its top-left pixel at `(x, y)`.
    pub fn open(path: impl AsRef<Path>, x: i32, y: i32) -> RasterResult<Self> {
        let image = image::open(path.as_ref())?;
        Self::from_image(&image, x, y)
    }

    /// Attach a property to this leaf.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.base = self.base.with_property(name, value);
        self
    }

    /// The stored raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }
}

impl RenderedImage for RasterSource {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn tile(&self, tx: i32, ty: i32, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_tile();
        let rect = self.base.tile_bounds(tx, ty)?;
        self.raster.child(rect)
    }

    fn data_region(&self, region: Rect, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_region();
        let rect = self.base.clip_region(&region)?;
        self.raster.child(rect)
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        dest.set_rect(&self.raster)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RasterError;
    use crate::core::raster::WritableRaster;

    #[test]
    fn test_filled_source() {
        let src = RasterSource::filled(Rect::new(0, 0, 10, 10), SampleLayout::GRAY, &[5]).unwrap();
        let ctx = RenderContext::new();
        let data = src.data(&ctx).unwrap();
        assert_eq!(data.bounds(), Rect::new(0, 0, 10, 10));
        assert!(data.to_vec().iter().all(|&s| s == 5));
    }

    #[test]
    fn test_tiles_are_views() {
        let src = RasterSource::with_tile_size(
            Raster::filled(Rect::new(-8, -8, 16, 16), SampleLayout::RGB, &[1, 2, 3]).unwrap(),
            8,
            8,
        )
        .unwrap();
        let ctx = RenderContext::new();
        let tile = src.tile(1, 1, &ctx).unwrap();
        assert_eq!(tile.bounds(), Rect::new(0, 0, 8, 8));
        assert!(tile.shares_storage(src.raster()));
        assert_eq!(ctx.stats().pixels_allocated, 0);
    }

    #[test]
    fn test_tile_out_of_range() {
        let src = RasterSource::with_tile_size(
            Raster::filled(Rect::new(0, 0, 16, 16), SampleLayout::GRAY, &[0]).unwrap(),
            8,
            8,
        )
        .unwrap();
        let ctx = RenderContext::new();
        assert!(matches!(src.tile(2, 0, &ctx), Err(RasterError::TileOutOfRange { .. })));
        assert!(matches!(src.tile(-1, 0, &ctx), Err(RasterError::TileOutOfRange { .. })));
    }

    #[test]
    fn test_copy_data_overlap_only() {
        let src = RasterSource::filled(Rect::new(0, 0, 4, 4), SampleLayout::GRAY, &[5]).unwrap();
        let ctx = RenderContext::new();
        let mut dest = WritableRaster::filled(Rect::new(-2, -2, 8, 8), SampleLayout::GRAY, &[200]).unwrap();
        src.copy_data(&mut dest.as_mut(), &ctx).unwrap();
        assert_eq!(dest.pixel(-1, -1).unwrap(), &[200]);
        assert_eq!(dest.pixel(0, 0).unwrap(), &[5]);
        assert_eq!(dest.pixel(4, 4).unwrap(), &[200]);
    }

    #[test]
    fn test_source_bounds_property() {
        let src = RasterSource::filled(Rect::new(3, 4, 5, 6), SampleLayout::GRAY, &[0]).unwrap();
        assert_eq!(
            src.property(SOURCE_BOUNDS).and_then(|v| v.as_rect()),
            Some(Rect::new(3, 4, 5, 6))
        );
    }

    #[test]
    fn test_open_missing_file() {
        let err = RasterSource::open("/definitely/not/here.png", 0, 0).unwrap_err();
        assert!(matches!(err, RasterError::Image(_)));
    }
}

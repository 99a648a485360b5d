//! Clipping to a rectangle.
//!
//! Like translation, a crop only changes what the node advertises; pixels
//! are served as views of the source's rasters.

use crate::core::context::RenderContext;
use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::{Raster, RasterMut};
use std::sync::Arc;

/// Restricts a source to the part of its bounds inside a clip rectangle.
///
/// The tile grid is inherited unchanged, so tile indices map one-to-one onto
/// the source's.
#[derive(Debug)]
pub struct CropOp {
    base: OperatorBase,
    source: RenderedRef,
}

impl CropOp {
    /// Clip `source` to `clip`. Fails if the two do not overlap.
    pub fn new(source: RenderedRef, clip: Rect) -> RasterResult<Self> {
        let bounds = source.bounds().intersection(&clip).ok_or_else(|| {
            RasterError::invalid(format!(
                "crop {} does not overlap source bounds {}",
                clip,
                source.bounds()
            ))
        })?;
        let base = OperatorBase::derived("crop", Arc::clone(&source), bounds, source.tile_grid())?;
        log::debug!("crop {} of {} to {}", base.id(), source.id(), bounds);
        Ok(Self { base, source })
    }

    /// The cropped node.
    pub fn source(&self) -> &RenderedRef {
        &self.source
    }
}

impl RenderedImage for CropOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn tile(&self, tx: i32, ty: i32, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_tile();
        let rect = self.base.tile_bounds(tx, ty)?;
        let r = self.source.tile(tx, ty, ctx)?;
        r.child(rect)
    }

    fn data_region(&self, region: Rect, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_region();
        let rect = self.base.clip_region(&region)?;
        self.source.data_region(rect, ctx)
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        let Some(overlap) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };
        let mut clipped = dest.child(overlap)?;
        self.source.copy_data(&mut clipped, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::SampleLayout;
    use crate::core::raster::WritableRaster;
    use crate::ops::source::RasterSource;

    fn source() -> RenderedRef {
        let bounds = Rect::new(0, 0, 8, 8);
        let data = (0..64).map(|i| i as u8).collect();
        let raster = Raster::new(bounds, SampleLayout::GRAY, data).unwrap();
        Arc::new(RasterSource::with_tile_size(raster, 4, 4).unwrap())
    }

    #[test]
    fn test_bounds_are_intersection() {
        let crop = CropOp::new(source(), Rect::new(2, 2, 100, 3)).unwrap();
        assert_eq!(crop.bounds(), Rect::new(2, 2, 6, 3));
        assert!(CropOp::new(source(), Rect::new(8, 0, 2, 2)).is_err());
    }

    #[test]
    fn test_tile_is_clipped_view() {
        let src = source();
        let crop = CropOp::new(Arc::clone(&src), Rect::new(2, 2, 4, 4)).unwrap();
        let ctx = RenderContext::new();
        let tile = crop.tile(1, 1, &ctx).unwrap();
        assert_eq!(tile.bounds(), Rect::new(4, 4, 2, 2));
        assert_eq!(tile.to_vec(), vec![36, 37, 44, 45]);
        assert_eq!(ctx.stats().pixels_allocated, 0);
    }

    #[test]
    fn test_copy_data_respects_clip() {
        let crop = CropOp::new(source(), Rect::new(2, 2, 2, 2)).unwrap();
        let ctx = RenderContext::new();
        let mut dest = WritableRaster::filled(Rect::new(0, 0, 8, 8), SampleLayout::GRAY, &[255]).unwrap();
        crop.copy_data(&mut dest.as_mut(), &ctx).unwrap();
        assert_eq!(dest.pixel(2, 2).unwrap(), &[18]);
        assert_eq!(dest.pixel(3, 3).unwrap(), &[27]);
        assert_eq!(dest.pixel(1, 1).unwrap(), &[255]);
        assert_eq!(dest.pixel(4, 4).unwrap(), &[255]);
    }

    #[test]
    fn test_region_outside_crop_fails() {
        let crop = CropOp::new(source(), Rect::new(0, 0, 2, 2)).unwrap();
        let ctx = RenderContext::new();
        assert!(matches!(
            crop.data_region(Rect::new(4, 4, 2, 2), &ctx),
            Err(RasterError::RegionOutOfBounds { .. })
        ));
    }
}

//! Integer translation.
//!
//! A special case of an affine transform that only moves the coordinate
//! system. The work is done by re-origining rasters, never by resampling:
//! the grid offset absorbs the shift, so tile `(tx, ty)` here is tile
//! `(tx, ty)` of the source moved by `(dx, dy)`.

use crate::core::context::RenderContext;
use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::{Raster, RasterMut};
use std::sync::Arc;

/// Re-origins a source by an integer offset with zero pixel copies.
#[derive(Debug)]
pub struct TranslateOp {
    base: OperatorBase,
    source: RenderedRef,
    delta_x: i32,
    delta_y: i32,
}

impl TranslateOp {
    /// Move `source` so that its minimum corner lands on `(x_loc, y_loc)`.
    ///
    /// Fails if the offset or the moved bounds leave the `i32` range.
    pub fn new(source: RenderedRef, x_loc: i32, y_loc: i32) -> RasterResult<Self> {
        let src_bounds = source.bounds();
        let out_of_range = || {
            RasterError::invalid(format!(
                "moving {} to ({}, {}) leaves the coordinate range",
                src_bounds, x_loc, y_loc
            ))
        };
        let delta_x = x_loc.checked_sub(src_bounds.min_x()).ok_or_else(out_of_range)?;
        let delta_y = y_loc.checked_sub(src_bounds.min_y()).ok_or_else(out_of_range)?;
        let bounds = src_bounds
            .checked_translated(delta_x, delta_y)
            .ok_or_else(out_of_range)?;
        let grid = source
            .tile_grid()
            .translated(delta_x, delta_y)
            .ok_or_else(out_of_range)?;
        let base = OperatorBase::derived("translate", Arc::clone(&source), bounds, grid)?;
        log::debug!(
            "translate {} of {} by ({}, {}) -> {}",
            base.id(),
            source.id(),
            delta_x,
            delta_y,
            bounds
        );
        Ok(Self {
            base,
            source,
            delta_x,
            delta_y,
        })
    }

    /// Shift `source` by `(dx, dy)`.
    pub fn by(source: RenderedRef, dx: i32, dy: i32) -> RasterResult<Self> {
        let bounds = source.bounds();
        match (bounds.min_x().checked_add(dx), bounds.min_y().checked_add(dy)) {
            (Some(x), Some(y)) => Self::new(source, x, y),
            _ => Err(RasterError::invalid(format!(
                "shifting {} by ({}, {}) leaves the coordinate range",
                bounds, dx, dy
            ))),
        }
    }

    /// Translation in x. The absolute location is `bounds().min_x()`.
    pub fn delta_x(&self) -> i32 {
        self.delta_x
    }

    /// Translation in y. The absolute location is `bounds().min_y()`.
    pub fn delta_y(&self) -> i32 {
        self.delta_y
    }

    /// The translated node.
    pub fn source(&self) -> &RenderedRef {
        &self.source
    }

    fn reorigin(&self, r: Raster) -> Raster {
        r.translated_child(r.min_x() + self.delta_x, r.min_y() + self.delta_y)
    }
}

impl RenderedImage for TranslateOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn tile(&self, tx: i32, ty: i32, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_tile();
        self.base.tile_bounds(tx, ty)?;
        let r = self.source.tile(tx, ty, ctx)?;
        Ok(self.reorigin(r))
    }

    fn data(&self, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_region();
        let r = self.source.data(ctx)?;
        Ok(self.reorigin(r))
    }

    fn data_region(&self, region: Rect, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_region();
        let clipped = self.base.clip_region(&region)?;
        let r = Rect::new(
            clipped.x - self.delta_x,
            clipped.y - self.delta_y,
            clipped.width,
            clipped.height,
        );
        let ret = self.source.data_region(r, ctx)?;
        Ok(self.reorigin(ret))
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        // Narrow to the overlap first; the far side of `dest` may not be
        // representable in source coordinates.
        let Some(area) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };
        let mut view = dest.child(area)?;
        let mut shifted = view.translated_child(area.x - self.delta_x, area.y - self.delta_y);
        self.source.copy_data(&mut shifted, ctx)
    }
}

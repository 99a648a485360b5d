//! Padding a source out to larger bounds.

use crate::core::context::RenderContext;
use crate::core::error::RasterResult;
use crate::core::geometry::Rect;
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::RasterMut;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How pixels outside the source are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// All samples zero (transparent black).
    #[default]
    Zero,
    /// Repeat the nearest edge pixel of the source.
    Replicate,
}

/// Extends a source to arbitrary bounds.
///
/// Pixels inside the source come from the source, the rest follow the
/// [`PadMode`]. Unlike translation and crop this allocates fresh tiles.
#[derive(Debug)]
pub struct PadOp {
    base: OperatorBase,
    source: RenderedRef,
    mode: PadMode,
}

impl PadOp {
    /// Pad (or clip) `source` to `bounds`.
    pub fn new(source: RenderedRef, bounds: Rect, mode: PadMode) -> RasterResult<Self> {
        let base = OperatorBase::derived("pad", Arc::clone(&source), bounds, source.tile_grid())?;
        log::debug!(
            "pad {} of {} from {} to {} ({:?})",
            base.id(),
            source.id(),
            source.bounds(),
            bounds,
            mode
        );
        Ok(Self { base, source, mode })
    }

    /// Padding mode.
    pub fn mode(&self) -> PadMode {
        self.mode
    }

    /// The padded node.
    pub fn source(&self) -> &RenderedRef {
        &self.source
    }

    fn replicate(&self, dest: &mut RasterMut<'_>, area: Rect, ctx: &RenderContext) -> RasterResult<()> {
        let src_bounds = self.source.bounds();
        let clamp_x = |x: i32| x.clamp(src_bounds.min_x(), src_bounds.max_x() - 1);
        let clamp_y = |y: i32| y.clamp(src_bounds.min_y(), src_bounds.max_y() - 1);

        // Source pixels the padded area can reach.
        let reach = Rect::from_corners(
            clamp_x(area.min_x()),
            clamp_y(area.min_y()),
            clamp_x(area.max_x() - 1) + 1,
            clamp_y(area.max_y() - 1) + 1,
        );
        let edge = self.source.data_region(reach, ctx)?;

        for y in area.min_y()..area.max_y() {
            for x in area.min_x()..area.max_x() {
                if src_bounds.contains(x, y) {
                    continue;
                }
                let px = edge.pixel(clamp_x(x), clamp_y(y))?;
                dest.set_pixel(x, y, px)?;
            }
        }
        Ok(())
    }
}

impl RenderedImage for PadOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        let Some(area) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };

        match self.mode {
            PadMode::Zero => {
                let zero = vec![0u8; self.sample_layout().bands()];
                dest.fill_rect(area, &zero)?;
            }
            PadMode::Replicate => self.replicate(dest, area, ctx)?,
        }

        if let Some(inner) = area.intersection(&self.source.bounds()) {
            let mut view = dest.child(inner)?;
            self.source.copy_data(&mut view, ctx)?;
        }
        Ok(())
    }
}

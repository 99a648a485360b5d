//! Per-pixel mapping operators.

use crate::core::context::RenderContext;
use crate::core::error::{RasterError, RasterResult};
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::RasterMut;
use std::fmt;
use std::sync::Arc;

/// Function applied in place to the samples of one pixel.
pub type PixelFn = Arc<dyn Fn(&mut [u8]) + Send + Sync>;

/// Applies a pixel function to every pixel of its source.
///
/// Bounds and tile grid are the source's. This is the hook for custom
/// filters that do not need neighbouring pixels.
pub struct PointOp {
    base: OperatorBase,
    source: RenderedRef,
    func: PixelFn,
}

impl PointOp {
    /// Map `source` through `func`. `kind` names the operator in logs.
    pub fn new(kind: &'static str, source: RenderedRef, func: PixelFn) -> RasterResult<Self> {
        let base = OperatorBase::derived(kind, Arc::clone(&source), source.bounds(), source.tile_grid())?;
        log::debug!("{} {} of {}", kind, base.id(), source.id());
        Ok(Self { base, source, func })
    }

    /// Invert the color bands, leaving alpha alone.
    pub fn invert(source: RenderedRef) -> RasterResult<Self> {
        let color_bands = color_bands(&source);
        Self::new(
            "invert",
            source,
            Arc::new(move |px: &mut [u8]| {
                for s in &mut px[..color_bands] {
                    *s = 255 - *s;
                }
            }),
        )
    }

    /// Multiply alpha by `factor` in `[0, 1]`. Premultiplied sources have
    /// their color bands scaled too.
    pub fn opacity(source: RenderedRef, factor: f32) -> RasterResult<Self> {
        if !(0.0..=1.0).contains(&factor) {
            return Err(RasterError::invalid(format!(
                "opacity {} is outside [0, 1]",
                factor
            )));
        }
        let model = source.color_model();
        if !model.has_alpha {
            return Err(RasterError::invalid("opacity needs a source with alpha"));
        }
        let premultiplied = model.premultiplied;
        Self::new(
            "opacity",
            source,
            Arc::new(move |px: &mut [u8]| {
                let scale = |s: u8| (s as f32 * factor).round() as u8;
                let alpha = px.len() - 1;
                if premultiplied {
                    for s in &mut px[..alpha] {
                        *s = scale(*s);
                    }
                }
                px[alpha] = scale(px[alpha]);
            }),
        )
    }

    /// The mapped node.
    pub fn source(&self) -> &RenderedRef {
        &self.source
    }
}

fn color_bands(source: &RenderedRef) -> usize {
    let bands = source.sample_layout().bands();
    if source.color_model().has_alpha {
        bands - 1
    } else {
        bands
    }
}

impl fmt::Debug for PointOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointOp")
            .field("base", &self.base)
            .field("func", &"<fn>")
            .finish()
    }
}

impl RenderedImage for PointOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        let Some(area) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };
        let mut view = dest.child(area)?;
        self.source.copy_data(&mut view, ctx)?;
        view.for_each_pixel_mut(|px| (self.func)(px));
        Ok(())
    }
}

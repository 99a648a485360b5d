//! Source-over compositing of several sources.

use crate::core::context::RenderContext;
use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::grid::TileGrid;
use crate::core::node::{OperatorBase, RenderedImage, RenderedRef};
use crate::core::raster::{Raster, RasterMut};

/// Stacks sources with the Porter-Duff "over" operator, first source at the
/// bottom.
///
/// All sources must share a sample layout whose last band is alpha. The
/// result covers the union of the source bounds; uncovered pixels are fully
/// transparent.
#[derive(Debug)]
pub struct CompositeOp {
    base: OperatorBase,
}

impl CompositeOp {
    /// Composite `sources` bottom to top.
    pub fn over(sources: Vec<RenderedRef>) -> RasterResult<Self> {
        let first = sources
            .first()
            .ok_or_else(|| RasterError::invalid("composite needs at least one source"))?;
        let layout = first.sample_layout();
        let color_model = first.color_model();
        if !color_model.has_alpha {
            return Err(RasterError::invalid("composite sources must carry alpha"));
        }
        for source in &sources[1..] {
            if source.sample_layout() != layout {
                return Err(RasterError::LayoutMismatch {
                    expected: layout,
                    got: source.sample_layout(),
                });
            }
            if source.color_model() != color_model {
                return Err(RasterError::invalid(format!(
                    "composite source {} has color model {:?}, expected {:?}",
                    source.id(),
                    source.color_model(),
                    color_model
                )));
            }
        }

        let bounds = sources
            .iter()
            .try_fold(Rect::default(), |acc, s| acc.union(&s.bounds()))
            .ok_or_else(|| RasterError::invalid("composite bounds exceed the coordinate range"))?;
        let first_grid = first.tile_grid();
        let grid = TileGrid::anchored(&bounds, first_grid.tile_width, first_grid.tile_height)?;
        let base = OperatorBase::new("composite", sources, bounds, layout, color_model, grid)?;
        log::debug!(
            "composite {} of {} source(s) -> {}",
            base.id(),
            base.sources().len(),
            bounds
        );
        Ok(Self { base })
    }
}

impl RenderedImage for CompositeOp {
    fn base(&self) -> &OperatorBase {
        &self.base
    }

    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
        ctx.check_interrupted()?;
        ctx.record_copy();
        let Some(area) = dest.bounds().intersection(&self.bounds()) else {
            return Ok(());
        };
        let bands = self.sample_layout().bands();
        let premultiplied = self.color_model().premultiplied;
        dest.fill_rect(area, &vec![0u8; bands])?;

        for source in self.sources() {
            ctx.check_interrupted()?;
            let Some(inner) = area.intersection(&source.bounds()) else {
                continue;
            };
            let layer = source.data_region(inner, ctx)?;
            blend_over(dest, &layer, premultiplied)?;
        }
        Ok(())
    }
}

/// Blend `src` over the overlapping pixels of `dest`.
fn blend_over(dest: &mut RasterMut<'_>, src: &Raster, premultiplied: bool) -> RasterResult<()> {
    let bounds = src.bounds();
    let mut out = [0u8; 4];
    for y in bounds.min_y()..bounds.max_y() {
        for x in bounds.min_x()..bounds.max_x() {
            let s = src.pixel(x, y)?;
            let d = dest.pixel(x, y)?;
            let n = s.len();
            over_pixel(s, d, &mut out[..n], premultiplied);
            dest.set_pixel(x, y, &out[..n])?;
        }
    }
    Ok(())
}

/// Porter-Duff over for one pixel with alpha in the last band.
fn over_pixel(s: &[u8], d: &[u8], out: &mut [u8], premultiplied: bool) {
    let alpha = s.len() - 1;
    let sa = s[alpha] as f32 / 255.0;
    let da = d[alpha] as f32 / 255.0;
    let oa = sa + da * (1.0 - sa);

    for i in 0..alpha {
        let sc = s[i] as f32;
        let dc = d[i] as f32;
        let c = if premultiplied {
            sc + dc * (1.0 - sa)
        } else if oa > 0.0 {
            (sc * sa + dc * da * (1.0 - sa)) / oa
        } else {
            0.0
        };
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[alpha] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
}

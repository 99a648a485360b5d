//! Serializable descriptions of pipeline operators.
//!
//! A [`NodeSpec`] says which operator to build and with which parameters;
//! the sources are supplied by the graph's connections at build time.

use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::grid::DEFAULT_TILE_SIZE;
use crate::core::layout::SampleLayout;
use crate::core::node::RenderedRef;
use crate::core::raster::Raster;
use crate::ops::{
    CompositeOp, CropOp, PadMode, PadOp, PointOp, RasterSource, TileCacheOp, TranslateOp,
    DEFAULT_CACHE_TILES,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// How many sources an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// At least this many.
    AtLeast(usize),
}

impl Arity {
    /// Whether `n` sources are acceptable.
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

/// Values used where a [`NodeSpec`] leaves a parameter unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildDefaults {
    /// Tile edge for leaves without an explicit `tile_size`.
    pub tile_size: i32,
    /// Capacity for caches without an explicit `capacity`.
    pub cache_capacity: usize,
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            cache_capacity: DEFAULT_CACHE_TILES,
        }
    }
}

/// Operator description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodeSpec {
    /// Solid raster leaf.
    Fill {
        bounds: Rect,
        samples: Vec<u8>,
        #[serde(default)]
        tile_size: Option<i32>,
    },
    /// Image file leaf with its top-left pixel at `(x, y)`.
    Image {
        path: PathBuf,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        tile_size: Option<i32>,
    },
    /// Shift the source by `(dx, dy)`.
    Translate { dx: i32, dy: i32 },
    /// Move the source's minimum corner to `(x, y)`.
    MoveTo { x: i32, y: i32 },
    /// Clip the source.
    Crop { rect: Rect },
    /// Pad the source out to `rect`.
    Pad {
        rect: Rect,
        #[serde(default)]
        mode: PadMode,
    },
    /// Source-over of all sources, slot 0 at the bottom.
    Composite,
    /// Invert color bands.
    Invert,
    /// Scale alpha.
    Opacity { factor: f32 },
    /// Memoize tiles.
    Cache {
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl NodeSpec {
    /// Short operator name.
    pub fn name(&self) -> &'static str {
        match self {
            NodeSpec::Fill { .. } => "fill",
            NodeSpec::Image { .. } => "image",
            NodeSpec::Translate { .. } => "translate",
            NodeSpec::MoveTo { .. } => "move_to",
            NodeSpec::Crop { .. } => "crop",
            NodeSpec::Pad { .. } => "pad",
            NodeSpec::Composite => "composite",
            NodeSpec::Invert => "invert",
            NodeSpec::Opacity { .. } => "opacity",
            NodeSpec::Cache { .. } => "cache",
        }
    }

    /// Number of sources the operator takes.
    pub fn arity(&self) -> Arity {
        match self {
            NodeSpec::Fill { .. } | NodeSpec::Image { .. } => Arity::Exact(0),
            NodeSpec::Composite => Arity::AtLeast(1),
            _ => Arity::Exact(1),
        }
    }

    /// Build the operator over `sources`, ordered by slot.
    pub fn instantiate(&self, sources: Vec<RenderedRef>) -> RasterResult<RenderedRef> {
        self.instantiate_with(sources, &BuildDefaults::default())
    }

    /// Build the operator, filling unset parameters from `defaults`.
    pub fn instantiate_with(
        &self,
        sources: Vec<RenderedRef>,
        defaults: &BuildDefaults,
    ) -> RasterResult<RenderedRef> {
        if !self.arity().accepts(sources.len()) {
            return Err(RasterError::invalid(format!(
                "{} cannot take {} source(s)",
                self.name(),
                sources.len()
            )));
        }

        let node: RenderedRef = match self {
            NodeSpec::Fill {
                bounds,
                samples,
                tile_size,
            } => {
                let layout = SampleLayout::new(samples.len()).ok_or_else(|| {
                    RasterError::invalid(format!("{} samples do not form a pixel", samples.len()))
                })?;
                let raster = Raster::filled(*bounds, layout, samples)?;
                let size = tile_size.unwrap_or(defaults.tile_size);
                Arc::new(RasterSource::with_tile_size(raster, size, size)?)
            }
            NodeSpec::Image {
                path,
                x,
                y,
                tile_size,
            } => {
                let image = image::open(path)?;
                let raster = Raster::from_image(&image, *x, *y)?;
                let size = tile_size.unwrap_or(defaults.tile_size);
                Arc::new(RasterSource::with_tile_size(raster, size, size)?)
            }
            NodeSpec::Composite => Arc::new(CompositeOp::over(sources)?),
            NodeSpec::Translate { dx, dy } => Arc::new(TranslateOp::by(sole(&sources)?, *dx, *dy)?),
            NodeSpec::MoveTo { x, y } => Arc::new(TranslateOp::new(sole(&sources)?, *x, *y)?),
            NodeSpec::Crop { rect } => Arc::new(CropOp::new(sole(&sources)?, *rect)?),
            NodeSpec::Pad { rect, mode } => Arc::new(PadOp::new(sole(&sources)?, *rect, *mode)?),
            NodeSpec::Invert => Arc::new(PointOp::invert(sole(&sources)?)?),
            NodeSpec::Opacity { factor } => Arc::new(PointOp::opacity(sole(&sources)?, *factor)?),
            NodeSpec::Cache { capacity } => Arc::new(TileCacheOp::new(
                sole(&sources)?,
                capacity.unwrap_or(defaults.cache_capacity),
            )?),
        };
        Ok(node)
    }
}

fn sole(sources: &[RenderedRef]) -> RasterResult<RenderedRef> {
    sources
        .first()
        .cloned()
        .ok_or_else(|| RasterError::invalid("operator needs a source"))
}

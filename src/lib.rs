//! # Tilegraph - Tiled, Lazily Evaluated Raster Pipelines
//!
//! Tilegraph builds image pipelines as graphs of operator nodes. Nothing is
//! computed until a consumer asks a node for a tile or a region; the node
//! then pulls exactly the pixels it needs from its sources.
//!
//! ## Features
//!
//! - **Pull-based evaluation**: tiles are computed on demand, per request
//! - **Zero-copy geometry**: translation and cropping hand out re-origined
//!   views of upstream storage instead of copying samples
//! - **Shared sub-graphs**: a node feeding several consumers is one `Arc`
//! - **Cooperative cancellation**: every fetch checks the render context
//! - **Parallel rendering**: tiles of the root are fetched on the rayon pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tilegraph::prelude::*;
//!
//! let mut graph = PipelineGraph::new();
//! let base = graph.add(NodeSpec::Fill {
//!     bounds: Rect::new(0, 0, 10, 10),
//!     samples: vec![5],
//!     tile_size: None,
//! });
//! let moved = graph.add_labelled("out", NodeSpec::MoveTo { x: 100, y: 200 });
//! graph.connect(base, moved, 0)?;
//!
//! let root = graph.build(moved)?;
//! let ctx = RenderContext::new();
//! let pixels = root.data_region(Rect::new(105, 205, 3, 3), &ctx)?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: rasters, tile grids, the [`RenderedImage`] contract, errors
//! - [`ops`]: built-in operators
//! - [`graph`]: serializable pipeline description and builder
//! - [`execution`]: tile-parallel renderer and progress reporting
//! - [`config`]: renderer configuration
//!
//! ## Writing Operators
//!
//! Embed an [`OperatorBase`] and implement `copy_data`; tile and region
//! fetches come for free:
//!
//! ```rust,ignore
//! use tilegraph::prelude::*;
//!
//! #[derive(Debug)]
//! struct Threshold {
//!     base: OperatorBase,
//!     source: RenderedRef,
//! }
//!
//! impl RenderedImage for Threshold {
//!     fn base(&self) -> &OperatorBase {
//!         &self.base
//!     }
//!
//!     fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()> {
//!         self.source.copy_data(dest, ctx)?;
//!         dest.for_each_pixel_mut(|px| px[0] = if px[0] > 127 { 255 } else { 0 });
//!         Ok(())
//!     }
//! }
//! ```
//!
//! [`RenderedImage`]: crate::core::node::RenderedImage
//! [`OperatorBase`]: crate::core::node::OperatorBase

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod execution;
pub mod graph;
pub mod ops;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use tilegraph::prelude::*;
/// ```
pub mod prelude {
    // Geometry and samples
    pub use crate::core::geometry::Rect;
    pub use crate::core::grid::{TileGrid, TileRange, DEFAULT_TILE_SIZE};
    pub use crate::core::layout::{ColorModel, ColorSpace, SampleLayout};
    pub use crate::core::raster::{Raster, RasterMut, WritableRaster};

    // Node contract
    pub use crate::core::node::{compute_region, OperatorBase, RenderedImage, RenderedRef};
    pub use crate::core::property::{PropertyMap, PropertyValue};

    // Contexts
    pub use crate::core::context::{CancelToken, FetchStats, RenderContext};

    // Errors
    pub use crate::core::error::{
        ConfigError, GraphError, GraphResult, NodeId, RasterError, RasterResult, TilegraphError,
        TilegraphResult,
    };

    // Operators
    pub use crate::ops::{
        CompositeOp, CropOp, PadMode, PadOp, PixelFn, PointOp, RasterSource, TileCacheOp,
        TileCacheStats, TranslateOp,
    };

    // Graph
    pub use crate::graph::{
        BuildDefaults, GraphNode, NodeSpec, PipelineGraph, SerializedGraph, TopologyAnalyzer,
    };

    // Rendering
    pub use crate::config::RenderConfig;
    pub use crate::execution::{
        to_rgba_image, RenderOptions, RenderOutput, RenderProgress, RenderStats, Renderer,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Core types and traits for the Tilegraph raster pipeline.
//!
//! This module contains the foundational types that make up the pipeline
//! including:
//! - Geometry and tile grids
//! - Sample layout and color descriptors
//! - Rasters and re-origined views
//! - The rendered-image contract and the base operator
//! - Named properties
//! - Error types and the evaluation context

pub mod context;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod layout;
pub mod node;
pub mod property;
pub mod raster;

// Re-export commonly used types
pub use context::{CancelToken, FetchStats, RenderContext};
pub use error::{ConfigError, GraphError, NodeId, RasterError, TilegraphError};
pub use geometry::Rect;
pub use grid::{TileGrid, TileRange};
pub use layout::{ColorModel, ColorSpace, SampleLayout};
pub use node::{OperatorBase, RenderedImage, RenderedRef};
pub use property::{PropertyMap, PropertyValue};
pub use raster::{Raster, RasterMut, WritableRaster};

//! Built-in pipeline operators.
//!
//! Geometry-remapping operators ([`TranslateOp`], [`CropOp`]) answer
//! requests with views of their source's rasters. The rest ([`PadOp`],
//! [`CompositeOp`], [`PointOp`]) compute fresh tiles. [`TileCacheOp`]
//! memoizes whatever sits below it.

pub mod cache;
pub mod composite;
pub mod crop;
pub mod pad;
pub mod point;
pub mod source;
pub mod translate;

// Re-export for direct access
pub use cache::{TileCacheOp, TileCacheStats, DEFAULT_CACHE_TILES};
pub use composite::CompositeOp;
pub use crop::CropOp;
pub use pad::{PadMode, PadOp};
pub use point::{PixelFn, PointOp};
pub use source::RasterSource;
pub use translate::TranslateOp;

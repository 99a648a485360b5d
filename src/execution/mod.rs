//! Rendering module.
//!
//! This module drives pixel evaluation of built pipelines.

pub mod progress;
pub mod renderer;

pub use progress::{ProgressCallback, ProgressTracker, RenderProgress};
pub use renderer::{to_rgba_image, RenderOptions, RenderOutput, RenderStats, Renderer};

//! Graph module for describing pipelines.
//!
//! A pipeline graph is a directed acyclic graph (DAG) where nodes describe
//! operators and edges feed one node's image into a numbered source slot of
//! another. [`PipelineGraph::build`] turns it into live [`RenderedImage`]
//! nodes.
//!
//! [`RenderedImage`]: crate::core::node::RenderedImage

pub mod build;
pub mod serialization;
pub mod spec;
pub mod structure;
pub mod topology;

// Re-export commonly used types
pub use serialization::{SerializedConnection, SerializedGraph, SerializedNode};
pub use spec::{Arity, BuildDefaults, NodeSpec};
pub use structure::{GraphMetadata, GraphNode, PipelineGraph};
pub use topology::TopologyAnalyzer;

//! Error types for Tilegraph.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Name the node and the rectangle or tile index that was rejected
//! - Keep cancellation distinct from data errors
//! - Surface construction problems before the first pixel is requested

use crate::core::geometry::Rect;
use crate::core::layout::SampleLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a node in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a node ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type for Tilegraph.
#[derive(Error, Debug)]
pub enum TilegraphError {
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while constructing operators or fetching pixels.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error(
        "Tile ({tile_x}, {tile_y}) is outside the tile grid of node {node_id} \
         (x tiles {min_tile_x}..{max_tile_x}, y tiles {min_tile_y}..{max_tile_y})"
    )]
    TileOutOfRange {
        node_id: NodeId,
        tile_x: i32,
        tile_y: i32,
        min_tile_x: i32,
        max_tile_x: i32,
        min_tile_y: i32,
        max_tile_y: i32,
    },

    #[error("Region {region} does not overlap bounds {bounds}")]
    RegionOutOfBounds { region: Rect, bounds: Rect },

    #[error("Invalid construction: {reason}")]
    InvalidConstruction { reason: String },

    #[error("Sample layout mismatch: expected {expected}, got {got}")]
    LayoutMismatch {
        expected: SampleLayout,
        got: SampleLayout,
    },

    #[error("Rendering interrupted")]
    Interrupted,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl RasterError {
    /// Shorthand for an [`RasterError::InvalidConstruction`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        RasterError::InvalidConstruction {
            reason: reason.into(),
        }
    }

    /// Whether this error is a cooperative cancellation rather than a data
    /// error.
    pub fn is_interruption(&self) -> bool {
        matches!(self, RasterError::Interrupted)
    }
}

/// Errors related to pipeline graph structure.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("No node labelled '{0}'")]
    LabelNotFound(String),

    #[error("Cycle detected in graph involving nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<NodeId> },

    #[error("Node {node_id} is missing source #{slot}")]
    MissingSource { node_id: NodeId, slot: usize },

    #[error("Source #{slot} of node {node_id} is already connected")]
    SlotOccupied { node_id: NodeId, slot: usize },

    #[error("Node {node_id} has no source slot #{slot}")]
    InvalidSlot { node_id: NodeId, slot: usize },

    #[error("Failed to build node {node_id}: {source}")]
    Build {
        node_id: NodeId,
        #[source]
        source: RasterError,
    },

    #[error("Graph is empty")]
    EmptyGraph,
}

impl GraphError {
    /// Get list of affected node IDs.
    pub fn affected_nodes(&self) -> Vec<NodeId> {
        match self {
            GraphError::NodeNotFound(node_id)
            | GraphError::MissingSource { node_id, .. }
            | GraphError::SlotOccupied { node_id, .. }
            | GraphError::InvalidSlot { node_id, .. }
            | GraphError::Build { node_id, .. } => vec![*node_id],
            GraphError::CycleDetected { nodes } => nodes.clone(),
            _ => vec![],
        }
    }
}

/// Errors loading or validating driver configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

/// Result type alias for top-level operations.
pub type TilegraphResult<T> = Result<T, TilegraphError>;

/// Result type alias for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

//! Graph serialization for saving and loading.

use crate::core::error::{GraphResult, NodeId, TilegraphResult};
use crate::graph::spec::NodeSpec;
use crate::graph::structure::{GraphMetadata, GraphNode, PipelineGraph};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable representation of a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Node ID
    #[serde(default)]
    pub id: NodeId,
    /// Optional label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Operator and parameters
    pub spec: NodeSpec,
}

/// Serializable representation of a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerializedConnection {
    /// Source node ID
    pub from: NodeId,
    /// Consumer node ID
    pub to: NodeId,
    /// Consumer slot
    #[serde(default)]
    pub slot: usize,
}

/// Serializable representation of a complete graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    /// Graph format version
    pub version: String,
    /// Graph metadata
    #[serde(default)]
    pub metadata: GraphMetadata,
    /// All nodes
    pub nodes: Vec<SerializedNode>,
    /// All connections
    #[serde(default)]
    pub connections: Vec<SerializedConnection>,
}

impl SerializedGraph {
    /// Current format version.
    pub const VERSION: &'static str = "1.0.0";

    /// Create a new serialized graph.
    pub fn new() -> Self {
        Self {
            version: Self::VERSION.to_string(),
            metadata: GraphMetadata::default(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to compact JSON (no whitespace).
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for SerializedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineGraph {
    /// Snapshot the graph in serializable form.
    pub fn to_serialized(&self) -> SerializedGraph {
        let mut connections: Vec<SerializedConnection> = self
            .connections()
            .map(|(from, to, slot)| SerializedConnection { from, to, slot })
            .collect();
        // Stable output regardless of edge insertion order.
        let position = |id: &NodeId| self.node_ids().position(|n| n == *id);
        connections.sort_by_key(|c| (position(&c.to), c.slot));

        SerializedGraph {
            version: SerializedGraph::VERSION.to_string(),
            metadata: self.metadata.clone(),
            nodes: self
                .nodes()
                .map(|n| SerializedNode {
                    id: n.id,
                    label: n.label.clone(),
                    spec: n.spec.clone(),
                })
                .collect(),
            connections,
        }
    }

    /// Rebuild a graph, re-checking every link.
    pub fn from_serialized(serialized: SerializedGraph) -> GraphResult<Self> {
        if serialized.version != SerializedGraph::VERSION {
            log::warn!(
                "graph format version {} differs from {}",
                serialized.version,
                SerializedGraph::VERSION
            );
        }
        let mut graph = PipelineGraph::new();
        graph.metadata = serialized.metadata;
        for node in serialized.nodes {
            graph.add_node(GraphNode {
                id: node.id,
                label: node.label,
                spec: node.spec,
            });
        }
        for conn in serialized.connections {
            graph.connect(conn.from, conn.to, conn.slot)?;
        }
        Ok(graph)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> TilegraphResult<String> {
        Ok(self.to_serialized().to_json()?)
    }

    /// Parse and validate a graph from JSON.
    pub fn from_json(json: &str) -> TilegraphResult<Self> {
        Ok(Self::from_serialized(SerializedGraph::from_json(json)?)?)
    }

    /// Load a graph from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> TilegraphResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        log::info!("loading graph from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    /// Save the graph as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> TilegraphResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

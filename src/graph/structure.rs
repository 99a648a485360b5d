//! Graph structure and node management.
//!
//! The PipelineGraph holds operator descriptions and the source links
//! between them. Edges run from a source node to the node consuming it and
//! carry the consumer's slot number.

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::graph::spec::{Arity, NodeSpec};
use indexmap::IndexMap;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// A node instance in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Unique identifier
    pub id: NodeId,
    /// Optional name used to pick render roots
    pub label: Option<String>,
    /// The operator to build
    pub spec: NodeSpec,
}

impl GraphNode {
    /// Create a new graph node for an operator.
    pub fn new(spec: NodeSpec) -> Self {
        Self {
            id: NodeId::new(),
            label: None,
            spec,
        }
    }

    /// Create with a specific ID.
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label, or the operator name when unlabelled.
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.spec.name().to_string())
    }
}

/// Metadata about the graph itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Optional name for this graph.
    pub name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Author information.
    pub author: Option<String>,
    /// Additional tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A directed acyclic graph of pipeline operators.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    graph: StableDiGraph<GraphNode, usize>,
    /// Insertion-ordered lookup from ID to graph index.
    index: IndexMap<NodeId, NodeIndex>,
    /// Graph metadata.
    pub metadata: GraphMetadata,
}

impl PipelineGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    // ========================================================================
    // Node Management
    // ========================================================================

    /// Add a node to the graph. A node with the same ID is replaced along
    /// with its links.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id;
        if let Some(old) = self.index.shift_remove(&id) {
            self.graph.remove_node(old);
        }
        let ix = self.graph.add_node(node);
        self.index.insert(id, ix);
        id
    }

    /// Add an unlabelled operator.
    pub fn add(&mut self, spec: NodeSpec) -> NodeId {
        self.add_node(GraphNode::new(spec))
    }

    /// Add a labelled operator.
    pub fn add_labelled(&mut self, label: impl Into<String>, spec: NodeSpec) -> NodeId {
        self.add_node(GraphNode::new(spec).with_label(label))
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<GraphNode> {
        let ix = self.index.shift_remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        self.graph.remove_node(ix).ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a reference to a node.
    pub fn get_node(&self, id: NodeId) -> GraphResult<&GraphNode> {
        Ok(&self.graph[self.index_of(id)?])
    }

    /// Get a mutable reference to a node.
    pub fn get_node_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode> {
        let ix = self.index_of(id)?;
        Ok(&mut self.graph[ix])
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Find the first node carrying `label`.
    pub fn find_by_label(&self, label: &str) -> GraphResult<NodeId> {
        self.nodes()
            .find(|n| n.label.as_deref() == Some(label))
            .map(|n| n.id)
            .ok_or_else(|| GraphError::LabelNotFound(label.to_string()))
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.index.values().map(move |&ix| &self.graph[ix])
    }

    /// All node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Get the number of links.
    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // ========================================================================
    // Connection Management
    // ========================================================================

    /// Feed `source` into slot `slot` of `consumer`.
    pub fn connect(&mut self, source: NodeId, consumer: NodeId, slot: usize) -> GraphResult<()> {
        let from = self.index_of(source)?;
        let to = self.index_of(consumer)?;

        if let Arity::Exact(k) = self.graph[to].spec.arity() {
            if slot >= k {
                return Err(GraphError::InvalidSlot {
                    node_id: consumer,
                    slot,
                });
            }
        }
        if self.source_at(to, slot).is_some() {
            return Err(GraphError::SlotOccupied {
                node_id: consumer,
                slot,
            });
        }
        // A path consumer -> source means the new link would close a loop.
        if has_path_connecting(&self.graph, to, from, None) {
            return Err(GraphError::CycleDetected {
                nodes: vec![source, consumer],
            });
        }

        self.graph.add_edge(from, to, slot);
        log::trace!("connected {} -> {}#{}", source, consumer, slot);
        Ok(())
    }

    /// Feed `sources` into slots `0..` of `consumer`.
    pub fn connect_all(&mut self, sources: &[NodeId], consumer: NodeId) -> GraphResult<()> {
        for (slot, &source) in sources.iter().enumerate() {
            self.connect(source, consumer, slot)?;
        }
        Ok(())
    }

    /// Remove whatever feeds slot `slot` of `consumer`, returning its ID.
    pub fn disconnect(&mut self, consumer: NodeId, slot: usize) -> GraphResult<Option<NodeId>> {
        let to = self.index_of(consumer)?;
        let edge = self
            .graph
            .edges_directed(to, Direction::Incoming)
            .find(|e| *e.weight() == slot)
            .map(|e| (e.id(), e.source()));
        Ok(edge.and_then(|(edge, from)| {
            self.graph.remove_edge(edge);
            self.graph.node_weight(from).map(|n| n.id)
        }))
    }

    /// `(slot, source)` pairs feeding `consumer`, ordered by slot.
    pub fn sources_of(&self, consumer: NodeId) -> GraphResult<Vec<(usize, NodeId)>> {
        let to = self.index_of(consumer)?;
        let mut sources: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(to, Direction::Incoming)
            .map(|e| (*e.weight(), self.graph[e.source()].id))
            .collect();
        sources.sort_by_key(|&(slot, _)| slot);
        Ok(sources)
    }

    /// Nodes that consume `source`.
    pub fn consumers_of(&self, source: NodeId) -> GraphResult<Vec<NodeId>> {
        let from = self.index_of(source)?;
        Ok(self
            .graph
            .neighbors_directed(from, Direction::Outgoing)
            .map(|ix| self.graph[ix].id)
            .collect())
    }

    /// `(source, consumer, slot)` for every link.
    pub fn connections(&self) -> impl Iterator<Item = (NodeId, NodeId, usize)> + '_ {
        self.graph
            .edge_references()
            .map(move |e| (self.graph[e.source()].id, self.graph[e.target()].id, *e.weight()))
    }

    // ========================================================================
    // Crate-internal access
    // ========================================================================

    pub(crate) fn index_of(&self, id: NodeId) -> GraphResult<NodeIndex> {
        self.index.get(&id).copied().ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn inner(&self) -> &StableDiGraph<GraphNode, usize> {
        &self.graph
    }

    pub(crate) fn source_at(&self, consumer: NodeIndex, slot: usize) -> Option<NodeIndex> {
        self.graph
            .edges_directed(consumer, Direction::Incoming)
            .find(|e| *e.weight() == slot)
            .map(|e| e.source())
    }
}

//! Topological analysis of pipeline graphs.
//!
//! Provides:
//! - Topological sorting (build order)
//! - Upstream closure of a render root
//! - Per-node slot validation

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::graph::spec::Arity;
use crate::graph::structure::PipelineGraph;
use petgraph::algo::toposort;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use std::collections::HashSet;

/// Analyzer for graph topology.
pub struct TopologyAnalyzer<'a> {
    graph: &'a PipelineGraph,
}

impl<'a> TopologyAnalyzer<'a> {
    /// Create a new analyzer for the given graph.
    pub fn new(graph: &'a PipelineGraph) -> Self {
        Self { graph }
    }

    /// Nodes ordered so that every source precedes its consumers.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        Ok(self
            .sorted_indices()?
            .into_iter()
            .map(|ix| self.graph.inner()[ix].id)
            .collect())
    }

    pub(crate) fn sorted_indices(&self) -> GraphResult<Vec<NodeIndex>> {
        toposort(self.graph.inner(), None).map_err(|cycle| GraphError::CycleDetected {
            nodes: vec![self.graph.inner()[cycle.node_id()].id],
        })
    }

    /// `root` and every node it transitively reads from.
    pub fn upstream_of(&self, root: NodeId) -> GraphResult<HashSet<NodeId>> {
        Ok(self
            .upstream_indices(root)?
            .into_iter()
            .map(|ix| self.graph.inner()[ix].id)
            .collect())
    }

    pub(crate) fn upstream_indices(&self, root: NodeId) -> GraphResult<HashSet<NodeIndex>> {
        let start = self.graph.index_of(root)?;
        let reversed = Reversed(self.graph.inner());
        let mut dfs = Dfs::new(reversed, start);
        let mut seen = HashSet::new();
        while let Some(ix) = dfs.next(reversed) {
            seen.insert(ix);
        }
        Ok(seen)
    }

    /// Nodes nothing consumes; the natural render roots.
    pub fn sinks(&self) -> Vec<NodeId> {
        let inner = self.graph.inner();
        self.graph
            .node_ids()
            .filter(|&id| {
                self.graph
                    .index_of(id)
                    .map(|ix| inner.neighbors_directed(ix, Direction::Outgoing).next().is_none())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Longest chain of sources below `node`. Leaves have depth 0.
    pub fn node_depth(&self, node: NodeId) -> GraphResult<usize> {
        let inner = self.graph.inner();
        let order = self.sorted_indices()?;
        let upstream = self.upstream_indices(node)?;
        let mut depth = std::collections::HashMap::new();
        for ix in order.into_iter().filter(|ix| upstream.contains(ix)) {
            let d = inner
                .neighbors_directed(ix, Direction::Incoming)
                .filter_map(|src| depth.get(&src).map(|d: &usize| d + 1))
                .max()
                .unwrap_or(0);
            depth.insert(ix, d);
        }
        let root = self.graph.index_of(node)?;
        Ok(depth.get(&root).copied().unwrap_or(0))
    }

    /// Check that every slot `node` requires is connected, with no gaps.
    pub fn check_slots(&self, node: NodeId) -> GraphResult<usize> {
        let ix = self.graph.index_of(node)?;
        let slots: Vec<usize> = self.graph.sources_of(node)?.into_iter().map(|(s, _)| s).collect();
        let required = match self.graph.inner()[ix].spec.arity() {
            Arity::Exact(k) => k,
            Arity::AtLeast(k) => k.max(slots.last().map_or(0, |&s| s + 1)),
        };
        for slot in 0..required {
            if slots.binary_search(&slot).is_err() {
                return Err(GraphError::MissingSource {
                    node_id: node,
                    slot,
                });
            }
        }
        Ok(required)
    }

    /// Validate the whole graph: acyclic, and every slot filled.
    pub fn validate(&self) -> GraphResult<()> {
        if self.graph.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        self.sorted_indices()?;
        for id in self.graph.node_ids() {
            self.check_slots(id)?;
        }
        Ok(())
    }
}

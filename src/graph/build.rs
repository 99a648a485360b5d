//! Turning a pipeline graph into live rendered-image nodes.

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::core::node::RenderedRef;
use crate::graph::spec::BuildDefaults;
use crate::graph::structure::PipelineGraph;
use crate::graph::topology::TopologyAnalyzer;
use std::collections::HashMap;
use std::sync::Arc;

impl PipelineGraph {
    /// Build the operator chain ending at `root`.
    ///
    /// Only `root` and its upstream nodes are instantiated, sources before
    /// consumers. A node feeding several consumers is built once and shared.
    pub fn build(&self, root: NodeId) -> GraphResult<RenderedRef> {
        self.build_with(root, &BuildDefaults::default())
    }

    /// Like [`build`](Self::build), filling unset parameters from `defaults`.
    pub fn build_with(&self, root: NodeId, defaults: &BuildDefaults) -> GraphResult<RenderedRef> {
        if self.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        let analyzer = TopologyAnalyzer::new(self);
        let upstream = analyzer.upstream_indices(root)?;
        let order = analyzer.sorted_indices()?;
        let inner = self.inner();

        let mut built: HashMap<NodeId, RenderedRef> = HashMap::with_capacity(upstream.len());
        for ix in order.into_iter().filter(|ix| upstream.contains(ix)) {
            let node = &inner[ix];
            let slots = analyzer.check_slots(node.id)?;

            let mut sources = Vec::with_capacity(slots);
            for slot in 0..slots {
                let source = self
                    .source_at(ix, slot)
                    .map(|src| inner[src].id)
                    .and_then(|id| built.get(&id))
                    .ok_or(GraphError::MissingSource {
                        node_id: node.id,
                        slot,
                    })?;
                sources.push(Arc::clone(source));
            }

            let image = node
                .spec
                .instantiate_with(sources, defaults)
                .map_err(|source| GraphError::Build {
                    node_id: node.id,
                    source,
                })?;
            log::debug!(
                "built {} ({}) as {} over {}",
                node.display_name(),
                node.id,
                image.kind(),
                image.bounds()
            );
            built.insert(node.id, image);
        }

        built.remove(&root).ok_or(GraphError::NodeNotFound(root))
    }

    /// Build the operator chain ending at the node labelled `label`.
    pub fn build_labelled(&self, label: &str) -> GraphResult<RenderedRef> {
        self.build(self.find_by_label(label)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RenderContext;
    use crate::core::error::RasterError;
    use crate::core::geometry::Rect;
    use crate::graph::spec::NodeSpec;

    fn fill(bounds: Rect, px: [u8; 4]) -> NodeSpec {
        NodeSpec::Fill {
            bounds,
            samples: px.to_vec(),
            tile_size: Some(4),
        }
    }

    #[test]
    fn test_build_translate_chain() {
        let mut graph = PipelineGraph::new();
        let leaf = graph.add(fill(Rect::new(0, 0, 10, 10), [5, 5, 5, 255]));
        let moved = graph.add_labelled("out", NodeSpec::MoveTo { x: 100, y: 200 });
        graph.connect(leaf, moved, 0).unwrap();

        let image = graph.build_labelled("out").unwrap();
        assert_eq!(image.bounds(), Rect::new(100, 200, 10, 10));
        assert_eq!(image.kind(), "translate");

        let ctx = RenderContext::new();
        let region = image.data_region(Rect::new(105, 205, 3, 3), &ctx).unwrap();
        assert!(region.to_vec().chunks(4).all(|px| px == [5, 5, 5, 255]));
    }

    #[test]
    fn test_fan_out_shares_instance() {
        let mut graph = PipelineGraph::new();
        let leaf = graph.add(fill(Rect::new(0, 0, 4, 4), [1, 2, 3, 255]));
        let comp = graph.add(NodeSpec::Composite);
        graph.connect_all(&[leaf, leaf], comp).unwrap();

        let image = graph.build(comp).unwrap();
        let sources = image.sources();
        assert_eq!(sources.len(), 2);
        assert!(Arc::ptr_eq(&sources[0], &sources[1]));
    }

    #[test]
    fn test_only_upstream_is_built() {
        let mut graph = PipelineGraph::new();
        let leaf = graph.add(fill(Rect::new(0, 0, 4, 4), [0, 0, 0, 255]));
        // Would fail to build: crop disjoint from its source.
        let broken = graph.add(NodeSpec::Crop {
            rect: Rect::new(50, 50, 1, 1),
        });
        graph.connect(leaf, broken, 0).unwrap();
        let inv = graph.add(NodeSpec::Invert);
        graph.connect(leaf, inv, 0).unwrap();

        assert!(graph.build(inv).is_ok());
        assert!(matches!(
            graph.build(broken),
            Err(GraphError::Build {
                source: RasterError::InvalidConstruction { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_overflowing_offset_is_build_error() {
        let mut graph = PipelineGraph::new();
        let leaf = graph.add(fill(Rect::new(0, 0, 4, 4), [0, 0, 0, 255]));
        let shift = graph.add(NodeSpec::Translate { dx: i32::MAX, dy: 0 });
        graph.connect(leaf, shift, 0).unwrap();

        match graph.build(shift) {
            Err(GraphError::Build { node_id, source }) => {
                assert_eq!(node_id, shift);
                assert!(matches!(source, RasterError::InvalidConstruction { .. }));
            }
            other => panic!("expected build error, got {:?}", other.map(|n| n.bounds())),
        }
    }

    #[test]
    fn test_missing_source_reported() {
        let mut graph = PipelineGraph::new();
        let inv = graph.add(NodeSpec::Invert);
        assert!(matches!(
            graph.build(inv),
            Err(GraphError::MissingSource { slot: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_root() {
        let mut graph = PipelineGraph::new();
        graph.add(fill(Rect::new(0, 0, 1, 1), [0; 4]));
        assert!(matches!(
            graph.build(NodeId::new()),
            Err(GraphError::NodeNotFound(_))
        ));
        assert!(matches!(
            PipelineGraph::new().build(NodeId::new()),
            Err(GraphError::EmptyGraph)
        ));
    }
}

//! End-to-end tests: graph and config files on disk through to PNG output.

use std::io::Write;
use tilegraph::prelude::*;

const GRAPH: &str = r#"{
  "version": "1.0.0",
  "metadata": { "name": "badge" },
  "nodes": [
    { "id": "6f1c2a1e-0000-4000-8000-000000000001", "label": "paper",
      "spec": { "op": "fill", "bounds": { "x": 0, "y": 0, "width": 16, "height": 16 },
                "samples": [255, 255, 255, 255] } },
    { "id": "6f1c2a1e-0000-4000-8000-000000000002", "label": "dot",
      "spec": { "op": "fill", "bounds": { "x": 0, "y": 0, "width": 4, "height": 4 },
                "samples": [200, 0, 0, 255], "tile_size": 2 } },
    { "id": "6f1c2a1e-0000-4000-8000-000000000003", "label": "placed",
      "spec": { "op": "move_to", "x": 6, "y": 6 } },
    { "id": "6f1c2a1e-0000-4000-8000-000000000004", "label": "out",
      "spec": { "op": "composite" } },
    { "id": "6f1c2a1e-0000-4000-8000-000000000005", "label": "cached",
      "spec": { "op": "cache" } }
  ],
  "connections": [
    { "from": "6f1c2a1e-0000-4000-8000-000000000002", "to": "6f1c2a1e-0000-4000-8000-000000000003", "slot": 0 },
    { "from": "6f1c2a1e-0000-4000-8000-000000000001", "to": "6f1c2a1e-0000-4000-8000-000000000004", "slot": 0 },
    { "from": "6f1c2a1e-0000-4000-8000-000000000003", "to": "6f1c2a1e-0000-4000-8000-000000000004", "slot": 1 },
    { "from": "6f1c2a1e-0000-4000-8000-000000000004", "to": "6f1c2a1e-0000-4000-8000-000000000005" }
  ]
}"#;

fn write_temp(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
fn test_render_graph_file_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = write_temp(&dir, "graph.json", GRAPH);
    let config_path = write_temp(&dir, "render.toml", "default_tile_size = 8\nparallel = true\nmax_threads = 2\n");

    let config = RenderConfig::load(&config_path).unwrap();
    let graph = PipelineGraph::load(&graph_path).unwrap();
    assert_eq!(graph.metadata.name.as_deref(), Some("badge"));

    let id = graph.find_by_label("cached").unwrap();
    let root = graph.build_with(id, &config.build_defaults()).unwrap();
    assert_eq!(root.bounds(), Rect::new(0, 0, 16, 16));
    assert_eq!(root.tile_range().len(), 4);

    let ctx = RenderContext::new();
    let output = Renderer::with_options(RenderOptions::from(&config))
        .render(root.as_ref(), None, &ctx)
        .unwrap();
    assert_eq!(output.raster.pixel(7, 7).unwrap(), &[200, 0, 0, 255]);
    assert_eq!(output.raster.pixel(0, 0).unwrap(), &[255, 255, 255, 255]);

    let png = dir.path().join("out.png");
    output.save(&png).unwrap();
    let decoded = image::open(&png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(9, 9).0, [200, 0, 0, 255]);
    assert_eq!(decoded.get_pixel(10, 10).0, [255, 255, 255, 255]);
}

#[test]
fn test_region_from_config() {
    let config = RenderConfig::from_toml_str("region = { x = 5, y = 5, width = 3, height = 3 }").unwrap();
    let graph = PipelineGraph::from_json(GRAPH).unwrap();
    let root = graph.build_labelled("out").unwrap();

    let output = Renderer::new()
        .render(root.as_ref(), config.region, &RenderContext::new())
        .unwrap();
    assert_eq!(output.raster.bounds(), Rect::new(5, 5, 3, 3));
    assert_eq!(output.raster.pixel(5, 5).unwrap(), &[255, 255, 255, 255]);
    assert_eq!(output.raster.pixel(6, 6).unwrap(), &[200, 0, 0, 255]);
}

#[test]
fn test_graph_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let graph = PipelineGraph::from_json(GRAPH).unwrap();
    let path = dir.path().join("copy.json");
    graph.save(&path).unwrap();

    let reloaded = PipelineGraph::load(&path).unwrap();
    assert_eq!(reloaded.node_count(), 5);
    assert_eq!(reloaded.connection_count(), 4);
    assert_eq!(
        TopologyAnalyzer::new(&reloaded).sinks(),
        vec![reloaded.find_by_label("cached").unwrap()]
    );
}

#[test]
fn test_missing_image_file_is_build_error() {
    let mut graph = PipelineGraph::new();
    let id = graph.add(NodeSpec::Image {
        path: "/no/such/image.png".into(),
        x: 0,
        y: 0,
        tile_size: None,
    });
    assert!(matches!(graph.build(id), Err(GraphError::Build { .. })));
}

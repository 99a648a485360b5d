//! Tilegraph CLI - render pipeline graphs to image files.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tilegraph::prelude::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("tilegraph");

    if args.len() < 2 {
        print_usage(program);
        return;
    }

    let result = match args[1].as_str() {
        "render" => render(&args[2..]),
        "info" => match args.get(2) {
            Some(path) => graph_info(path),
            None => Err(anyhow::anyhow!("please specify a graph file")),
        },
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("Tilegraph v{}", tilegraph::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  render <graph.json> <root-label> <out.png> [options]  Render a node to a file");
    println!("  info <graph.json>                                     Describe a graph");
    println!("  help                                                  Show this help message");
    println!();
    println!("Render options:");
    println!("  --config <file>        TOML render configuration");
    println!("  --region <x,y,w,h>     Render only this rectangle");
    println!("  --sequential           Fetch tiles on one thread");
    println!();
    println!("Set RUST_LOG=debug for per-node logging.");
}

fn parse_region(text: &str) -> Result<Rect> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("region '{}' is not four integers", text))?;
    match parts.as_slice() {
        &[x, y, w, h] if w > 0 && h > 0 => Ok(Rect::new(x, y, w, h)),
        _ => bail!("region '{}' must be x,y,width,height with positive size", text),
    }
}

fn render(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        bail!("usage: render <graph.json> <root-label> <out.png> [--config <file>] [--region <x,y,w,h>] [--sequential]");
    }
    let graph_path = PathBuf::from(&args[0]);
    let label = &args[1];
    let output_path = PathBuf::from(&args[2]);

    let mut config = RenderConfig::default();
    let mut region_override = None;
    let mut sequential = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config = RenderConfig::load(&args[i + 1])
                    .with_context(|| format!("loading config {}", args[i + 1]))?;
                i += 2;
            }
            "--region" if i + 1 < args.len() => {
                region_override = Some(parse_region(&args[i + 1])?);
                i += 2;
            }
            "--sequential" => {
                sequential = true;
                i += 1;
            }
            other => bail!("unknown render option: {}", other),
        }
    }
    if sequential {
        config = config.with_parallel(false);
    }
    if let Some(region) = region_override {
        config = config.with_region(region);
    }

    let graph = PipelineGraph::load(&graph_path)
        .with_context(|| format!("loading graph {}", graph_path.display()))?;
    let root = graph
        .find_by_label(label)
        .and_then(|id| graph.build_with(id, &config.build_defaults()))
        .with_context(|| format!("building node '{}'", label))?;

    let ctx = RenderContext::new();
    let last_percent = Arc::new(parking_lot::Mutex::new(0u32));
    let options = RenderOptions::from(&config).with_progress(move |update| {
        if let RenderProgress::Progress { percent, .. } = update {
            let mut last = last_percent.lock();
            let step = (percent / 10.0) as u32;
            if step > *last {
                *last = step;
                log::info!("{:.0}%", percent);
            }
        }
    });

    let output = Renderer::with_options(options).render(root.as_ref(), config.region, &ctx)?;
    output.save(&output_path)?;

    let fetch = output.stats.fetch;
    println!(
        "Rendered {} ({}) to {} in {:?}",
        label,
        output.raster.bounds(),
        output_path.display(),
        output.stats.duration
    );
    println!(
        "  {} tile(s), {} tile request(s), {} region request(s), {} pixel(s) allocated",
        output.stats.tiles, fetch.tile_requests, fetch.region_requests, fetch.pixels_allocated
    );
    Ok(())
}

fn graph_info(path: &str) -> Result<()> {
    let graph = PipelineGraph::load(path).with_context(|| format!("loading graph {}", path))?;
    let analyzer = TopologyAnalyzer::new(&graph);

    println!(
        "Graph: {}",
        graph.metadata.name.as_deref().unwrap_or("(unnamed)")
    );
    if let Some(description) = &graph.metadata.description {
        println!("  {}", description);
    }
    println!(
        "{} node(s), {} connection(s)",
        graph.node_count(),
        graph.connection_count()
    );
    println!();

    for id in analyzer.topological_sort()? {
        let node = graph.get_node(id)?;
        let sources: Vec<String> = graph
            .sources_of(id)?
            .into_iter()
            .map(|(slot, src)| format!("#{}={}", slot, graph.get_node(src).map(|n| n.display_name()).unwrap_or_default()))
            .collect();
        let shape = match graph.build(id) {
            Ok(image) => format!(
                "{} {:?} tiles {}x{}",
                image.bounds(),
                image.sample_layout(),
                image.tile_range().num_x(),
                image.tile_range().num_y()
            ),
            Err(err) => format!("cannot build: {}", err),
        };
        println!(
            "  {:<12} {:<10} depth {} [{}] {}",
            node.display_name(),
            node.spec.name(),
            analyzer.node_depth(id)?,
            sources.join(", "),
            shape
        );
    }

    let sinks: Vec<String> = analyzer
        .sinks()
        .into_iter()
        .filter_map(|id| graph.get_node(id).ok().map(|n| n.display_name()))
        .collect();
    println!();
    println!("Sinks: {}", sinks.join(", "));
    Ok(())
}

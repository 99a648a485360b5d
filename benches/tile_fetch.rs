//! Benchmarks for tile and region fetches through translate chains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tilegraph::prelude::*;

fn leaf() -> RenderedRef {
    let raster = Raster::filled(Rect::new(0, 0, 1024, 1024), SampleLayout::RGBA, &[10, 20, 30, 255])
        .expect("valid raster");
    Arc::new(RasterSource::with_tile_size(raster, 128, 128).expect("valid tile size"))
}

fn chain(depth: usize) -> RenderedRef {
    (0..depth).fold(leaf(), |node, i| {
        Arc::new(TranslateOp::by(node, 3 + i as i32, -5).expect("translate")) as RenderedRef
    })
}

fn bench_tile_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_chain");
    let ctx = RenderContext::new();

    for depth in [1usize, 8, 32] {
        let root = chain(depth);
        let range = root.tile_range();

        group.bench_function(BenchmarkId::new("tile", depth), |b| {
            b.iter(|| black_box(root.tile(range.min_x + 2, range.min_y + 3, &ctx)))
        });

        let bounds = root.bounds();
        let region = Rect::new(bounds.x + 100, bounds.y + 100, 300, 300);
        group.bench_function(BenchmarkId::new("data_region", depth), |b| {
            b.iter(|| black_box(root.data_region(region, &ctx)))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("render");
    let root: RenderedRef = Arc::new(PointOp::invert(chain(4)).expect("invert"));
    for parallel in [false, true] {
        let renderer = Renderer::with_options(RenderOptions::new().with_parallel(parallel));
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| black_box(renderer.render(root.as_ref(), None, &ctx)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tile_fetch);
criterion_main!(benches);

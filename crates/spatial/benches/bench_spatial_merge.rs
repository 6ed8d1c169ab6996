use std::hint::black_box;
use std::time::Instant;

use glam::DVec2;
use placeweave_common::{Connection, EcosystemId, Vertex, VertexId};
use placeweave_spatial::{
    LayoutConfig, MergeParams, Projection, SpatialGrid, apply_layout, merge_projections,
};

fn scatter(count: usize, spacing: f64) -> Vec<DVec2> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| DVec2::new((i % side) as f64 * spacing, (i / side) as f64 * spacing))
        .collect()
}

fn projections(count: usize, per_projection: usize) -> Vec<Projection> {
    (0..count)
        .map(|k| {
            let offset = DVec2::new(k as f64 * 7.0, k as f64 * 3.0);
            let vertices: Vec<Vertex> = scatter(per_projection, 12.0)
                .into_iter()
                .enumerate()
                .map(|(i, p)| Vertex {
                    id: VertexId(i as u32),
                    x: p.x + offset.x,
                    y: p.y + offset.y,
                    ecosystem: EcosystemId::Grassland,
                    depth: i as u32,
                    parent: i.checked_sub(1).map(|p| VertexId(p as u32)),
                })
                .collect();
            let connections = (1..vertices.len())
                .map(|i| Connection::growth(VertexId(i as u32 - 1), VertexId(i as u32), 12.0))
                .collect();
            Projection {
                vertices,
                connections,
            }
        })
        .collect()
}

fn bench_rebuild(count: usize, iterations: usize) {
    let positions = scatter(count, 4.0);
    let mut grid = SpatialGrid::new(16.0);

    let start = Instant::now();
    for _ in 0..iterations {
        grid.rebuild(black_box(&positions));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  rebuild ({count} points, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_merge(count: usize, per_projection: usize, iterations: usize) {
    let params = MergeParams {
        threshold: 10.0,
        degree_cap: 5,
    };
    let start = Instant::now();
    for _ in 0..iterations {
        let merged = merge_projections(black_box(projections(count, per_projection)), &params);
        black_box(merged.stats);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  merge ({count} x {per_projection} vertices, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_layout(count: usize, iterations: usize) {
    let start_positions = scatter(count, 6.0);
    let edges: Vec<(usize, usize)> = (1..count).map(|i| (i - 1, i)).collect();
    let center = DVec2::splat(100.0);
    let radii = DVec2::new(100.0, 200.0);

    let start = Instant::now();
    for _ in 0..iterations {
        let mut positions = start_positions.clone();
        black_box(apply_layout(
            &mut positions,
            &edges,
            center,
            radii,
            &LayoutConfig::default(),
        ));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  layout ({count} vertices, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Spatial Benchmarks ===\n");

    println!("Grid rebuild:");
    bench_rebuild(100, 1000);
    bench_rebuild(1000, 100);
    bench_rebuild(10000, 10);

    println!("\nProjection merge:");
    bench_merge(3, 64, 100);
    bench_merge(6, 128, 20);

    println!("\nForce layout:");
    bench_layout(60, 10);
    bench_layout(200, 2);

    println!("\n=== Done ===");
}

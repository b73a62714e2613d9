//! Benchmarks for the fishnet and per-year overlay stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use rivershift_algorithms::change::{
    clip_fishnet, fishnet, number_cells, overlay_year, unchanged_by_cell, unchanged_fragments,
    Coverage, FishnetParams, GridCell, RiverFeature,
};
use rivershift_algorithms::vector::BoundingBox;

/// Square study area of `size` cells per side
fn study_area(size: usize) -> (BoundingBox, Vec<MultiPolygon<f64>>) {
    let extent = size as f64 * 30.0;
    let bounds = BoundingBox::new(0.0, 0.0, extent, extent);
    (bounds, vec![MultiPolygon::new(vec![bounds.to_polygon()])])
}

/// A meandering band running bottom to top, shifted sideways by `offset`
fn river(size: usize, offset: f64) -> Vec<RiverFeature> {
    let extent = size as f64 * 30.0;
    let steps = 64;
    let width = extent / 8.0;
    let centre = |t: f64| extent / 2.0 + offset + (t * 6.0).sin() * extent / 6.0;

    let mut left: Vec<Coord<f64>> = Vec::with_capacity(steps + 1);
    let mut right: Vec<Coord<f64>> = Vec::with_capacity(steps + 1);
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        let y = t * extent;
        left.push(Coord { x: centre(t) - width / 2.0, y });
        right.push(Coord { x: centre(t) + width / 2.0, y });
    }
    right.reverse();
    left.extend(right);
    RiverFeature::from_polygons([MultiPolygon::new(vec![Polygon::new(LineString::new(left), vec![])])])
}

fn grid(size: usize) -> Vec<GridCell> {
    let (bounds, area) = study_area(size);
    let cells = fishnet(&bounds, &FishnetParams::default()).unwrap();
    number_cells(clip_fishnet(&cells, &area))
}

fn bench_fishnet(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/fishnet");
    for size in [32, 64, 128] {
        let (bounds, area) = study_area(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let cells = fishnet(black_box(&bounds), &FishnetParams::default()).unwrap();
                number_cells(clip_fishnet(&cells, &area))
            })
        });
    }
    group.finish();
}

fn bench_overlay_year(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/overlay_year");
    for size in [32, 64, 128] {
        let cells = grid(size);
        let rivers = river(size, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| overlay_year(black_box(&cells), &rivers))
        });
    }
    group.finish();
}

fn bench_unchanged_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/unchanged_area");
    for size in [32, 64, 128] {
        let cells = grid(size);
        let year1 = overlay_year(&cells, &river(size, 0.0));
        let year2 = overlay_year(&cells, &river(size, size as f64 * 2.0));
        group.bench_with_input(BenchmarkId::new("fragments", size), &size, |b, _| {
            b.iter(|| unchanged_fragments(black_box(&year1), black_box(&year2)))
        });

        let coverage1 = Coverage::from_overlay(&year1);
        let coverage2 = Coverage::from_overlay(&year2);
        group.bench_with_input(BenchmarkId::new("by_cell", size), &size, |b, _| {
            b.iter(|| unchanged_by_cell(black_box(&coverage1), black_box(&coverage2)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fishnet, bench_overlay_year, bench_unchanged_area);
criterion_main!(benches);

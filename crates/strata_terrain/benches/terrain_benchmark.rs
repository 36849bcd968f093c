//! Benchmark for full tile synthesis and the tile cache.
//!
//! TARGET: a 80x45 viewport generated cold in well under a frame budget
//! once prewarmed in parallel.
//!
//! Run with: cargo bench --package strata_terrain --bench terrain_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_terrain::TerrainGenerator;

fn benchmark_single_tile(c: &mut Criterion) {
    let generator = TerrainGenerator::new(42.0, 0).expect("valid seed");

    c.bench_function("compute_single_tile", |b| {
        let mut x = 0i32;
        b.iter(|| {
            x = x.wrapping_add(7);
            black_box(generator.compute(black_box(x), black_box(-x)))
        });
    });
}

fn benchmark_cached_tile(c: &mut Criterion) {
    let generator = TerrainGenerator::new(42.0, 1024).expect("valid seed");
    let _ = generator.sample(10, 10);

    c.bench_function("sample_cached_tile", |b| {
        b.iter(|| black_box(generator.sample(black_box(10), black_box(10))));
    });
}

fn benchmark_viewport_prewarm(c: &mut Criterion) {
    let mut group = c.benchmark_group("viewport");
    group.throughput(Throughput::Elements(80 * 45));
    group.sample_size(10);

    group.bench_function("prewarm_80x45", |b| {
        let generator = TerrainGenerator::new(42.0, 8192).expect("valid seed");
        let mut origin = 0i32;
        b.iter(|| {
            origin += 200;
            black_box(generator.prewarm_region(origin, 0, 80, 45))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_tile,
    benchmark_cached_tile,
    benchmark_viewport_prewarm
);
criterion_main!(benches);

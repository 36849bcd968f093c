//! Benchmark for noise and FBM throughput.
//!
//! Run with: cargo bench --package strata_terrain --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_terrain::fractal::{FbmOptions, FractalSynthesizer};
use strata_terrain::noise::{SimplexNoise, WorldSeed};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42.0));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_grid_samples(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42.0));

    let mut group = c.benchmark_group("grid_samples");
    group.throughput(Throughput::Elements(100_000));
    group.sample_size(10);

    group.bench_function("100k_noise_samples", |b| {
        b.iter(|| {
            for i in 0..100_000u32 {
                let x = f64::from(i % 1000) * 0.1;
                let y = f64::from(i / 1000) * 0.1;
                black_box(noise.sample(x, y));
            }
        });
    });

    group.finish();
}

fn benchmark_fbm_uncached(c: &mut Criterion) {
    let synth = FractalSynthesizer::new(WorldSeed::new(42.0));
    let options = FbmOptions::DEFAULT;

    c.bench_function("fbm_6_octaves_uncached", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 1.0;
            black_box(synth.fbm_uncached(black_box(x), black_box(x * 0.7), &options))
        });
    });
}

fn benchmark_fbm_memo_hit(c: &mut Criterion) {
    let synth = FractalSynthesizer::new(WorldSeed::new(42.0));
    let options = FbmOptions {
        ridged: true,
        ..FbmOptions::DEFAULT
    };
    let _ = synth.fbm(12.0, 34.0, &options);

    c.bench_function("fbm_ridged_memo_hit", |b| {
        b.iter(|| black_box(synth.fbm(black_box(12.0), black_box(34.0), &options)));
    });
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_grid_samples,
    benchmark_fbm_uncached,
    benchmark_fbm_memo_hit
);
criterion_main!(benches);

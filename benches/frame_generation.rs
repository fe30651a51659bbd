//! Benchmarks for frame generation
//!
//! Measures the per-frame cost of the generator outside the scheduling loop:
//! - Steady-state frames with Laplace noise at the default bitrate
//! - A full burst sequence after a bitrate change
//! - Raw Laplace sampling
//!
//! Run with: `cargo bench --features benchmark --bench frame_generation`

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use syncodec::noise::{LaplaceNoise, Noise};
use syncodec::{BitrateState, CodecConfig, CodecOption, FrameGenerator};
use tokio::time::Instant;

fn bench_steady_state(c: &mut Criterion) {
    let config = CodecConfig::with_options([CodecOption::Seed(1)]).expect("valid config");
    let mut generator = FrameGenerator::from_config(&config);
    let mut state = BitrateState::new(config.target_bitrate_bps);

    let mut group = c.benchmark_group("steady_state");
    let bytes_per_frame = config.target_bitrate_bps / (8 * config.frames_per_second as u64);
    group.throughput(Throughput::Bytes(bytes_per_frame));

    group.bench_function("default_bitrate", |b| {
        b.iter(|| black_box(generator.next_frame(black_box(&mut state))))
    });

    group.finish();
}

fn bench_burst_sequence(c: &mut Criterion) {
    let config = CodecConfig::with_options([
        CodecOption::Seed(2),
        CodecOption::TargetBitrate(2_000_000),
        CodecOption::ReactionLatency(std::time::Duration::ZERO),
    ])
    .expect("valid config");
    let mut generator = FrameGenerator::from_config(&config);
    let mut state = BitrateState::new(config.target_bitrate_bps);
    let now = Instant::now();

    c.bench_function("burst_sequence", |b| {
        b.iter(|| {
            state.try_update(black_box(2_000_000), now, &config);
            for _ in 0..config.burst_frame_count {
                black_box(generator.next_frame(&mut state));
            }
        })
    });
}

fn bench_laplace_sample(c: &mut Criterion) {
    let mut noise = LaplaceNoise::seeded(0.15, 3);

    c.bench_function("laplace_sample", |b| b.iter(|| black_box(noise.sample())));
}

criterion_group!(benches, bench_steady_state, bench_burst_sequence, bench_laplace_sample);
criterion_main!(benches);

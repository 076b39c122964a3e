//! Engine benchmarks
//!
//! Measures performance of the audio callback and the parameter surface.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use heron_core::{EngineConfig, EqProcessor, ParameterId, ParameterStore, UpdateMode};

fn prepared_processor(mode: UpdateMode, block_size: usize) -> EqProcessor {
    let params = Arc::new(ParameterStore::new());
    params.set(ParameterId::LowCutFreq, 80.0);
    params.set(ParameterId::LowCutSlope, 3.0);
    params.set(ParameterId::Band2Gain, 4.5);

    let config = EngineConfig {
        update_mode: mode,
        ..Default::default()
    };
    let mut processor = EqProcessor::new(params, &config);
    // Taps are dropped; collectors then just count drops
    let _ = processor.prepare(48000, block_size as u32);
    processor
}

fn benchmark_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("eq_processor");

    // Typical buffer sizes used in real-time audio
    for buffer_size in [64, 128, 256, 512, 1024] {
        let mut left: Vec<f32> = (0..buffer_size).map(|i| (i as f32 * 0.001).sin()).collect();
        let mut right = left.clone();

        group.throughput(Throughput::Elements(buffer_size as u64 * 2));

        for mode in [UpdateMode::Always, UpdateMode::OnChange] {
            let mut processor = prepared_processor(mode, buffer_size);
            group.bench_function(format!("process_{:?}_{}_frames", mode, buffer_size), |b| {
                b.iter(|| {
                    processor.process(black_box(&mut left), black_box(&mut right));
                })
            });
        }

        let mut processor = prepared_processor(UpdateMode::Always, buffer_size);
        let mut interleaved: Vec<f32> = (0..buffer_size * 2)
            .map(|i| (i as f32 * 0.001).sin())
            .collect();
        group.bench_function(format!("process_interleaved_{}_frames", buffer_size), |b| {
            b.iter(|| {
                processor.process_interleaved(black_box(&mut interleaved));
            })
        });
    }

    group.finish();
}

fn benchmark_parameter_surface(c: &mut Criterion) {
    let params = ParameterStore::new();

    c.bench_function("parameter_set", |b| {
        let mut gain = 0.0_f32;
        b.iter(|| {
            // Simulate dragging a slider
            params.set(ParameterId::Band1Gain, black_box(gain));
            gain = (gain + 0.5) % 24.0;
        })
    });

    c.bench_function("chain_settings_snapshot", |b| {
        b.iter(|| black_box(params.chain_settings()))
    });
}

criterion_group!(benches, benchmark_processor, benchmark_parameter_surface);
criterion_main!(benches);

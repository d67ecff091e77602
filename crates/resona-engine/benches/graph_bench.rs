//! Hot-path benchmarks: one callback through typical filter graphs.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::Path;

use resona_config::channels::mask;
use resona_config::{Compiler, DeviceInfo, NullStore, StagePhase, StreamFormat};
use resona_engine::FilterGraph;

const FRAMES: usize = 512;

fn format(channels: usize, channel_mask: u32) -> StreamFormat {
    StreamFormat {
        sample_rate: 48000.0,
        input_channels: channels,
        real_channels: channels,
        output_channels: channels,
        channel_mask,
        max_frames: FRAMES,
    }
}

fn build(text: &str, format: &StreamFormat) -> FilterGraph {
    let store = NullStore;
    let compiler = Compiler::new(*format, DeviceInfo::default(), StagePhase::PostMix, &store);
    FilterGraph::from_compiled(compiler.compile_str(text, Path::new("/tmp")), format)
}

fn sweep_input(lanes: usize) -> Vec<f32> {
    (0..FRAMES * lanes)
        .map(|i| ((i as f32) * 0.037).sin() * 0.5)
        .collect()
}

fn bench_graphs(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_process");

    let stereo = format(2, mask::STEREO);
    let input = sweep_input(2);
    let mut output = vec![0.0f32; FRAMES * 2];

    let mut eq10 = build(
        &(1..=10)
            .map(|i| format!("Filter {i}: ON PK Fc {} Hz Gain 3 dB Q 1.41\n", (60 << (i - 1)).min(16000)))
            .collect::<String>(),
        &stereo,
    );
    group.bench_function("stereo_10_band_eq", |b| {
        b.iter(|| {
            eq10.process(black_box(&input), FRAMES);
            eq10.write(black_box(&mut output), FRAMES);
        })
    });

    let mut routing = build(
        "Copy: SUB=0.5*L+0.5*R\nChannel: SUB\nFilter 1: ON LP Fc 120 Hz\nChannel: all\nPreamp: -3 dB\nDelay: 2 ms\n",
        &stereo,
    );
    group.bench_function("stereo_bass_mixdown", |b| {
        b.iter(|| {
            routing.process(black_box(&input), FRAMES);
            routing.write(black_box(&mut output), FRAMES);
        })
    });

    let surround = format(6, mask::SURROUND_5_1);
    let input6 = sweep_input(6);
    let mut output6 = vec![0.0f32; FRAMES * 6];
    let mut surround_eq = build(
        "Filter 1: ON PK Fc 80 Hz Gain 4 dB Q 1.0\nFilter 2: ON HS Fc 8000 Hz Gain -2 dB\n",
        &surround,
    );
    group.bench_function("surround_two_band_eq", |b| {
        b.iter(|| {
            surround_eq.process(black_box(&input6), FRAMES);
            surround_eq.write(black_box(&mut output6), FRAMES);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_graphs);
criterion_main!(benches);

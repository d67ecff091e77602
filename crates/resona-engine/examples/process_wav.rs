//! Runs a configuration over a WAV file.
//!
//! ```text
//! cargo run --example process_wav -- <config-dir> <input.wav> <output.wav>
//! ```
//!
//! The config directory must contain a `config.txt`. Editing it while this
//! runs will hot-swap the chain mid-file, crossfade included.

use std::path::PathBuf;

use resona_config::channels::default_channel_mask;
use resona_engine::{EngineSettings, FilterEngine, StreamFormat};

const BLOCK_FRAMES: usize = 512;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_dir), Some(input_path), Some(output_path)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: process_wav <config-dir> <input.wav> <output.wav>");
        std::process::exit(2);
    };

    let mut reader = hound::WavReader::open(&input_path).expect("open input wav");
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap()).collect(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap() as f32 * scale)
                .collect()
        }
    };

    let mut engine = FilterEngine::new(EngineSettings::new(PathBuf::from(config_dir)));
    engine.set_device_info(false, "process_wav", "offline", "{process-wav}");
    engine
        .initialize(StreamFormat {
            sample_rate: spec.sample_rate as f64,
            input_channels: channels,
            real_channels: channels,
            output_channels: channels,
            channel_mask: default_channel_mask(channels),
            max_frames: BLOCK_FRAMES,
        })
        .expect("initialize engine");

    let mut writer = hound::WavWriter::create(
        &output_path,
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    )
    .expect("create output wav");

    let mut output = vec![0.0f32; BLOCK_FRAMES * channels];
    for block in samples.chunks(BLOCK_FRAMES * channels) {
        let frames = block.len() / channels;
        engine.process(block, &mut output[..frames * channels]);
        for &sample in &output[..frames * channels] {
            writer.write_sample(sample).expect("write sample");
        }
    }
    writer.finalize().expect("finalize output wav");

    println!("processed {} -> {}", input_path, output_path);
}

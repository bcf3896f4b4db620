//! Specmorph offline renderer
//!
//! Runs a WAV file through the spectral engine and writes the result as
//! 32-bit float stereo.
//!
//! ```text
//! specmorph-render <input.wav> <output.wav> [preset.spectral] [engine.yaml]
//! ```
//!
//! Mono input is duplicated to both channels. The engine's latency is
//! compensated so the output lines up with the input. Set `RUST_LOG=debug`
//! for per-swap logging, `RUST_LOG=trace` for per-frame logging.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use specmorph_core::config::{load_config, EngineConfig};
use specmorph_core::observe::LogObserver;
use specmorph_core::state::load_preset;
use specmorph_core::{create_engine, StereoBuffer, StereoSample};

struct Args {
    input: PathBuf,
    output: PathBuf,
    preset: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: specmorph-render <input.wav> <output.wav> [preset.spectral] [engine.yaml]");
    };
    Ok(Args {
        input,
        output,
        preset: args.next(),
        config: args.next(),
    })
}

/// Factor mapping signed integer samples of `bits` depth into [-1, 1)
fn int_sample_scale(bits: u16) -> Result<f32> {
    if !(1..=32).contains(&bits) {
        bail!("bit depth {} outside 1..=32", bits);
    }
    Ok(1.0 / (1u64 << (bits - 1)) as f32)
}

/// Read a WAV file as stereo samples; returns (samples, sample rate)
fn read_wav(path: &Path) -> Result<(Vec<StereoSample>, u32)> {
    let mut reader = WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let spec = reader.spec();
    let raw: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        SampleFormat::Int => {
            let scale = int_sample_scale(spec.bits_per_sample)
                .with_context(|| format!("Unsupported WAV {:?}", path))?;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    let channels = spec.channels as usize;
    let samples: Vec<StereoSample> = match channels {
        0 => bail!("{:?} has no channels", path),
        1 => raw.iter().map(|&s| StereoSample::new(s, s)).collect(),
        _ => raw
            .chunks_exact(channels)
            .map(|frame| StereoSample::new(frame[0], frame[1]))
            .collect(),
    };
    Ok((samples, spec.sample_rate))
}

fn write_wav(path: &Path, samples: &[StereoSample], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).with_context(|| format!("Failed to create {:?}", path))?;
    for s in samples {
        writer.write_sample(s.left)?;
        writer.write_sample(s.right)?;
    }
    writer.finalize().context("Failed to finalize WAV")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    let (input, sample_rate) = read_wav(&args.input)?;
    log::info!(
        "Read {} samples at {} Hz from {:?}",
        input.len(),
        sample_rate,
        args.input
    );

    let mut config: EngineConfig = match &args.config {
        Some(path) => load_config(path),
        None => EngineConfig::default(),
    };
    config.sample_rate = sample_rate as f32;

    let (mut engine, mut controller) = create_engine(config)?;
    engine.set_observer(Box::new(LogObserver));

    if let Some(path) = &args.preset {
        let state = load_preset(path).with_context(|| format!("Failed to load preset {:?}", path))?;
        controller.load_state(&state)?;
    }

    let latency = engine.latency_samples();
    let block_size = engine.config().max_block_size;
    let mut output = Vec::with_capacity(input.len() + latency);
    let mut block = StereoBuffer::with_capacity(block_size);

    // Flush the latency tail with silence
    let padded = input
        .iter()
        .copied()
        .chain(std::iter::repeat(StereoSample::silence()).take(latency))
        .collect::<Vec<_>>();
    for chunk in padded.chunks(block_size) {
        block.clear();
        for &s in chunk {
            block.push(s);
        }
        engine.process(&mut block);
        output.extend_from_slice(block.as_slice());
    }

    let aligned = output.get(latency..).unwrap_or(&[]);
    write_wav(&args.output, aligned, sample_rate)?;
    log::info!(
        "Wrote {} samples to {:?} ({} frames processed)",
        aligned.len(),
        args.output,
        engine.frames_processed()
    );
    Ok(())
}

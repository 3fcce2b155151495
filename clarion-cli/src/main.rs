//! Offline WAV cleaner.
//!
//! Decodes a WAV file, resamples it to the working rate when needed, runs
//! the cleaning chain, and writes the cleaned result as 16-bit PCM.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clarion_core::{
    audio::resample::RateAdapter, wav, AudioBuffer, CleaningPipeline, DspConfig, FileSource,
    FrameSource,
};

/// Resampler input chunk size; any reasonable block length works offline.
const RESAMPLE_CHUNK: usize = 1024;

#[derive(Debug)]
struct Args {
    input: PathBuf,
    output: PathBuf,
    /// Working rate to clean at; `None` keeps the file's own rate.
    rate: Option<u32>,
}

fn parse_args() -> Result<Args, String> {
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut rate: Option<u32> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--rate" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --rate".into());
                };
                let parsed = v
                    .parse::<u32>()
                    .map_err(|_| "invalid value for --rate".to_string())?;
                if parsed == 0 {
                    return Err("--rate must be positive".into());
                }
                rate = Some(parsed);
            }
            "--help" | "-h" => {
                println!("Usage: clarion-cli <in.wav> <out.wav> [--rate HZ]");
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown argument: {other}"));
            }
            path => positional.push(PathBuf::from(path)),
        }
    }

    if positional.len() != 2 {
        return Err("expected exactly two paths: <in.wav> <out.wav>".into());
    }
    let output = positional.pop().expect("length checked");
    let input = positional.pop().expect("length checked");
    Ok(Args { input, output, rate })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("clarion-cli: {e}");
            eprintln!("Usage: clarion-cli <in.wav> <out.wav> [--rate HZ]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("clarion-cli: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let source = FileSource::new(
        wav::read_mono(&args.input)
            .with_context(|| format!("reading {}", args.input.display()))?,
    );
    let mut buffer = source.acquire().context("empty input file")?;

    if let Some(rate) = args.rate {
        if rate != buffer.sample_rate {
            buffer = resample_buffer(buffer, rate)?;
        }
    }

    let pipeline = CleaningPipeline::new(DspConfig::default())?;
    let result = pipeline
        .clean(buffer)
        .context("cleaning failed")?;

    wav::write(&args.output, &result.cleaned)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        secs = format!("{:.2}", result.cleaned.duration_secs()),
        "done"
    );
    Ok(())
}

/// Offline whole-buffer resample: push fixed chunks through the adapter,
/// flush its tail with silence, and trim to the exact expected length.
fn resample_buffer(buffer: AudioBuffer, target_rate: u32) -> anyhow::Result<AudioBuffer> {
    let source_rate = buffer.sample_rate;
    let expected =
        (buffer.len() as f64 * target_rate as f64 / source_rate as f64).round() as usize;

    let mut adapter = RateAdapter::new(source_rate, target_rate, RESAMPLE_CHUNK)?;
    let mut out = Vec::with_capacity(expected);
    for chunk in buffer.samples.chunks(RESAMPLE_CHUNK) {
        out.extend(adapter.convert(chunk));
    }
    // Padding with silence pushes the last partial chunk through rubato.
    let mut flushes = 0;
    while out.len() < expected {
        out.extend(adapter.convert(&[0.0f32; RESAMPLE_CHUNK]));
        flushes += 1;
        if flushes > 8 {
            bail!("resampler made no progress while flushing");
        }
    }
    out.truncate(expected);

    info!(source_rate, target_rate, samples = out.len(), "resampled input");
    Ok(AudioBuffer::new(out, target_rate))
}

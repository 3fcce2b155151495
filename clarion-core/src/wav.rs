//! WAV file I/O.
//!
//! Reading accepts integer and float PCM at any channel count and downmixes
//! to mono f32. Writing always produces 16-bit PCM mono, which every player
//! understands.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use crate::buffering::chunk::AudioBuffer;
use crate::error::Result;

/// Read a WAV file into a mono [`AudioBuffer`] at the file's sample rate.
///
/// Interleaved channels are averaged per frame; integer samples are scaled
/// to [-1.0, 1.0].
///
/// # Errors
/// `ClarionError::Wav` on a malformed file, `ClarionError::Io` on read
/// failures.
pub fn read_mono(path: &Path) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<hound::Result<_>>()?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    info!(
        path = %path.display(),
        rate = spec.sample_rate,
        channels,
        samples = samples.len(),
        "wav loaded"
    );
    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

/// Write a mono buffer as 16-bit PCM. Samples outside [-1.0, 1.0] are
/// clamped rather than wrapped.
///
/// # Errors
/// `ClarionError::Wav` / `ClarionError::Io` on write failures.
pub fn write(path: &Path, buf: &AudioBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buf.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &buf.samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    info!(
        path = %path.display(),
        samples = buf.len(),
        "wav written"
    );
    Ok(())
}

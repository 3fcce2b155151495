//! The fixed cleaning chain applied to a captured window.

use tracing::{debug, info};

use crate::buffering::chunk::AudioBuffer;
use crate::dsp::bandpass::{self, FilterSpec};
use crate::dsp::denoise::NoiseReducer;
use crate::dsp::{gain, DspConfig};
use crate::error::Result;

/// Output of one cleaning run: the untouched input alongside the cleaned
/// signal, so callers can A/B the two or persist both.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub original: AudioBuffer,
    pub cleaned: AudioBuffer,
}

/// Runs the cleaning chain:
/// normalize → spectral gate → band-pass → amplify → normalize.
///
/// The stage order is fixed. Normalizing first gives the gate a consistent
/// dynamic range to estimate noise from; the final normalize re-bounds
/// whatever headroom the intermediate stages consumed or created.
pub struct CleaningPipeline {
    config: DspConfig,
    denoiser: NoiseReducer,
}

impl CleaningPipeline {
    /// # Errors
    /// `ClarionError::InvalidSignal` if the denoise frame/hop configuration
    /// is degenerate.
    pub fn new(config: DspConfig) -> Result<Self> {
        let denoiser = NoiseReducer::new(config.denoise)?;
        Ok(Self { config, denoiser })
    }

    pub fn config(&self) -> &DspConfig {
        &self.config
    }

    /// Clean one captured window. The input is kept unmodified in the
    /// result; all stages run on a copy.
    ///
    /// # Errors
    /// - `ClarionError::InvalidSignal` if the window is shorter than one
    ///   denoise analysis frame.
    /// - `ClarionError::InvalidBand` if the configured band does not fit
    ///   under the buffer's Nyquist frequency.
    pub fn clean(&self, original: AudioBuffer) -> Result<PipelineResult> {
        let mut cleaned = original.clone();

        gain::normalize(&mut cleaned, self.config.normalize_target);
        debug!(peak = cleaned.peak(), "pre-gate normalize done");

        cleaned = self.denoiser.process(&cleaned)?;

        // The filter is designed against the buffer's actual rate so a
        // resampled or file-sourced window is banded correctly.
        let spec = FilterSpec::design(
            self.config.filter_order,
            self.config.band_low_hz,
            self.config.band_high_hz,
            cleaned.sample_rate,
        )?;
        bandpass::apply(&mut cleaned, &spec)?;

        gain::amplify(&mut cleaned, self.config.gain);
        gain::normalize(&mut cleaned, self.config.normalize_target);

        info!(
            samples = cleaned.len(),
            secs = format!("{:.2}", cleaned.duration_secs()),
            "cleaning pipeline finished"
        );
        Ok(PipelineResult { original, cleaned })
    }
}

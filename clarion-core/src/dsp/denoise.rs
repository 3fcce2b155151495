//! Spectral-gating noise reduction.
//!
//! No noise-only reference clip is required: the whole buffer is the noise
//! estimation corpus. Per frequency bin, a threshold of
//! `mean + k·std` over all analysis frames separates stationary noise from
//! speech transients; bins below it are attenuated by a soft mask with a
//! configurable floor (total silencing produces musical-noise artifacts).
//! The mask is box-averaged across time and frequency before application,
//! and the signal is rebuilt by inverse FFT + overlap-add with
//! window-power normalization, trimmed to the input length exactly.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use crate::buffering::chunk::AudioBuffer;
use crate::error::{ClarionError, Result};

/// Parameters of the spectral gate.
#[derive(Debug, Clone, Copy)]
pub struct DenoiseConfig {
    /// Analysis frame length in samples. Default: 1024.
    pub frame_len: usize,
    /// Hop between frames in samples (75 % overlap by default). Default: 256.
    pub hop_len: usize,
    /// Threshold statistic multiplier: threshold = mean + k·std. Default: 1.5.
    pub threshold_k: f32,
    /// Minimum mask gain; prevents total silencing of gated bins. Default: 0.1.
    pub gain_floor: f32,
    /// Mask smoothing radius across frames. Default: 2.
    pub time_smooth: usize,
    /// Mask smoothing radius across bins. Default: 2.
    pub freq_smooth: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            frame_len: 1024,
            hop_len: 256,
            threshold_k: 1.5,
            gain_floor: 0.1,
            time_smooth: 2,
            freq_smooth: 2,
        }
    }
}

/// Spectral-gating denoiser. Holds the FFT plans and analysis window;
/// processing itself is a pure function of the input buffer.
pub struct NoiseReducer {
    config: DenoiseConfig,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl NoiseReducer {
    /// Build a denoiser for the given configuration.
    ///
    /// # Errors
    /// `ClarionError::InvalidSignal` for a degenerate frame/hop combination;
    /// this is a construction-time configuration error, not a data error.
    pub fn new(config: DenoiseConfig) -> Result<Self> {
        if config.frame_len < 2 || config.hop_len == 0 || config.hop_len > config.frame_len {
            return Err(ClarionError::InvalidSignal(format!(
                "frame_len {} / hop_len {} is not a valid analysis grid",
                config.frame_len, config.hop_len
            )));
        }

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(config.frame_len);
        let inverse = planner.plan_fft_inverse(config.frame_len);

        // Hann window, applied at analysis and synthesis.
        let window = (0..config.frame_len)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / config.frame_len as f32).cos())
            })
            .collect();

        Ok(Self {
            config,
            forward,
            inverse,
            window,
        })
    }

    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Denoise the buffer. Output has the same length and sample rate as the
    /// input; amplitude may exceed [-1, 1] and is re-bounded by a later
    /// normalize stage.
    ///
    /// # Errors
    /// `ClarionError::InvalidSignal` if the input is shorter than one
    /// analysis frame.
    pub fn process(&self, buf: &AudioBuffer) -> Result<AudioBuffer> {
        let frame = self.config.frame_len;
        let hop = self.config.hop_len;
        let n = buf.len();

        if n < frame {
            return Err(ClarionError::InvalidSignal(format!(
                "input of {n} samples is shorter than one analysis frame ({frame})"
            )));
        }

        // Zero-pad so the frame grid covers the tail deterministically.
        let num_frames = (n - frame).div_ceil(hop) + 1;
        let padded_len = (num_frames - 1) * hop + frame;
        let half = frame / 2;
        let bins = half + 1;

        // Analysis: windowed FFT per frame, magnitudes for the lower half.
        let mut spectra: Vec<Vec<Complex<f32>>> = Vec::with_capacity(num_frames);
        let mut magnitudes: Vec<Vec<f32>> = Vec::with_capacity(num_frames);
        for f in 0..num_frames {
            let pos = f * hop;
            let mut spectrum: Vec<Complex<f32>> = (0..frame)
                .map(|i| {
                    let s = buf.samples.get(pos + i).copied().unwrap_or(0.0);
                    Complex::new(s * self.window[i], 0.0)
                })
                .collect();
            self.forward.process(&mut spectrum);
            magnitudes.push(spectrum[..bins].iter().map(|c| c.norm()).collect());
            spectra.push(spectrum);
        }

        // Per-bin noise threshold from the magnitude statistics of the clip.
        let thresholds = bin_thresholds(&magnitudes, bins, self.config.threshold_k);

        // Soft gate mask, then smooth it across time and frequency.
        let floor = self.config.gain_floor;
        let mut mask: Vec<Vec<f32>> = magnitudes
            .iter()
            .map(|frame_mags| {
                frame_mags
                    .iter()
                    .zip(&thresholds)
                    .map(|(&mag, &thresh)| {
                        if thresh <= f32::EPSILON {
                            1.0
                        } else {
                            ((mag / thresh) * (mag / thresh)).min(1.0).max(floor)
                        }
                    })
                    .collect()
            })
            .collect();
        smooth_over_time(&mut mask, self.config.time_smooth);
        smooth_over_freq(&mut mask, self.config.freq_smooth);

        // Synthesis: mask, mirror for a real signal, inverse FFT, overlap-add.
        let mut output = vec![0.0f32; padded_len];
        let mut window_power = vec![0.0f32; padded_len];
        let scale = 1.0 / frame as f32;
        for (f, spectrum) in spectra.iter_mut().enumerate() {
            for b in 0..bins {
                spectrum[b] *= mask[f][b];
            }
            for b in 1..half {
                spectrum[frame - b] = spectrum[b].conj();
            }
            self.inverse.process(spectrum);

            let pos = f * hop;
            for i in 0..frame {
                output[pos + i] += spectrum[i].re * scale * self.window[i];
                window_power[pos + i] += self.window[i] * self.window[i];
            }
        }
        for (sample, power) in output.iter_mut().zip(&window_power) {
            if *power > 1e-3 {
                *sample /= power;
            }
        }
        output.truncate(n);

        debug!(
            frames = num_frames,
            bins, "spectral gate applied"
        );
        Ok(AudioBuffer::new(output, buf.sample_rate))
    }
}

/// Per-bin `mean + k·std` of the magnitude across all frames.
fn bin_thresholds(magnitudes: &[Vec<f32>], bins: usize, k: f32) -> Vec<f32> {
    let frames = magnitudes.len() as f32;
    (0..bins)
        .map(|b| {
            let mean = magnitudes.iter().map(|m| m[b]).sum::<f32>() / frames;
            let var = magnitudes
                .iter()
                .map(|m| (m[b] - mean) * (m[b] - mean))
                .sum::<f32>()
                / frames;
            mean + k * var.sqrt()
        })
        .collect()
}

/// Box-average each bin's gain over neighbouring frames.
fn smooth_over_time(mask: &mut [Vec<f32>], radius: usize) {
    if radius == 0 || mask.is_empty() {
        return;
    }
    let frames = mask.len();
    let bins = mask[0].len();
    let snapshot: Vec<Vec<f32>> = mask.to_vec();
    for f in 0..frames {
        let lo = f.saturating_sub(radius);
        let hi = (f + radius).min(frames - 1);
        let span = (hi - lo + 1) as f32;
        for b in 0..bins {
            mask[f][b] = snapshot[lo..=hi].iter().map(|m| m[b]).sum::<f32>() / span;
        }
    }
}

/// Box-average each frame's gain over neighbouring bins.
fn smooth_over_freq(mask: &mut [Vec<f32>], radius: usize) {
    if radius == 0 {
        return;
    }
    for frame_mask in mask.iter_mut() {
        let bins = frame_mask.len();
        let snapshot = frame_mask.clone();
        for b in 0..bins {
            let lo = b.saturating_sub(radius);
            let hi = (b + radius).min(bins - 1);
            let span = (hi - lo + 1) as f32;
            frame_mask[b] = snapshot[lo..=hi].iter().sum::<f32>() / span;
        }
    }
}

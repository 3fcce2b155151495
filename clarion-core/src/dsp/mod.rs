//! Signal cleaning stages and their composition.
//!
//! Each stage lives in its own module and is independently testable;
//! [`pipeline::CleaningPipeline`] chains them in the one order the engine
//! uses.

pub mod bandpass;
pub mod denoise;
pub mod gain;
pub mod pipeline;

pub use denoise::DenoiseConfig;

/// Tunable parameters of the cleaning chain.
#[derive(Debug, Clone, Copy)]
pub struct DspConfig {
    /// Band-pass low edge in Hz.
    pub band_low_hz: f32,
    /// Band-pass high edge in Hz.
    pub band_high_hz: f32,
    /// Butterworth filter order (must be even).
    pub filter_order: usize,
    /// Peak target for both normalize stages.
    pub normalize_target: f32,
    /// Post-filter gain, hard-clipped to [-1, 1].
    pub gain: f32,
    pub denoise: DenoiseConfig,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            band_low_hz: 500.0,
            band_high_hz: 2800.0,
            filter_order: 6,
            normalize_target: 0.9,
            gain: 2.0,
            denoise: DenoiseConfig::default(),
        }
    }
}

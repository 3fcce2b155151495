//! Butterworth band limiting for the speech band.
//!
//! Realized as `order/2` high-pass biquad sections at the low edge cascaded
//! with `order/2` low-pass sections at the high edge, each section's Q taken
//! from the Butterworth pole angles. Filtering is causal and forward-only;
//! the resulting group delay is deterministic and left uncorrected.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type};

use crate::buffering::chunk::AudioBuffer;
use crate::error::{ClarionError, Result};

/// Immutable description of a band-limiting filter.
///
/// Coefficients are derived deterministically from these four values at
/// apply time; the spec itself carries no state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    order: usize,
    low_hz: f32,
    high_hz: f32,
    sample_rate: u32,
}

impl FilterSpec {
    /// Validate and build a filter spec.
    ///
    /// # Errors
    /// `ClarionError::InvalidBand` unless `0 < low_hz < high_hz < rate/2`
    /// and `order` is a positive even number (each cascaded section is
    /// second-order).
    pub fn design(order: usize, low_hz: f32, high_hz: f32, sample_rate: u32) -> Result<Self> {
        let nyquist = sample_rate as f32 / 2.0;
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(ClarionError::InvalidBand(format!(
                "edges must satisfy 0 < {low_hz} < {high_hz} < {nyquist} (Nyquist)"
            )));
        }
        if order == 0 || order % 2 != 0 {
            return Err(ClarionError::InvalidBand(format!(
                "order must be a positive even number, got {order}"
            )));
        }
        Ok(Self {
            order,
            low_hz,
            high_hz,
            sample_rate,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn low_hz(&self) -> f32 {
        self.low_hz
    }

    pub fn high_hz(&self) -> f32 {
        self.high_hz
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Per-section Q values from the Butterworth pole angles:
    /// `Q_k = 1 / (2 cos((2k + 1)π / 2n))` for `k = 0 .. n/2`.
    fn section_qs(&self) -> Vec<f32> {
        let n = self.order as f32;
        (0..self.order / 2)
            .map(|k| {
                let theta = (2.0 * k as f32 + 1.0) * std::f32::consts::PI / (2.0 * n);
                1.0 / (2.0 * theta.cos())
            })
            .collect()
    }

    fn sections(&self) -> Result<Vec<DirectForm1<f32>>> {
        let fs = (self.sample_rate as f32).hz();
        let mut sections = Vec::with_capacity(self.order);
        for q in self.section_qs() {
            let hp = Coefficients::<f32>::from_params(Type::HighPass, fs, self.low_hz.hz(), q)
                .map_err(|e| ClarionError::InvalidBand(format!("high-pass section: {e:?}")))?;
            let lp = Coefficients::<f32>::from_params(Type::LowPass, fs, self.high_hz.hz(), q)
                .map_err(|e| ClarionError::InvalidBand(format!("low-pass section: {e:?}")))?;
            sections.push(DirectForm1::<f32>::new(hp));
            sections.push(DirectForm1::<f32>::new(lp));
        }
        Ok(sections)
    }
}

/// Run the buffer through the band-limiting cascade in place.
///
/// Output length equals input length. Filter state starts at zero each
/// call, so the result is a pure function of the input.
///
/// # Errors
/// `ClarionError::InvalidSignal` if the buffer's rate differs from the rate
/// the spec was designed for.
pub fn apply(buf: &mut AudioBuffer, spec: &FilterSpec) -> Result<()> {
    if buf.sample_rate != spec.sample_rate {
        return Err(ClarionError::InvalidSignal(format!(
            "buffer rate {} Hz does not match filter design rate {} Hz",
            buf.sample_rate, spec.sample_rate
        )));
    }

    let mut sections = spec.sections()?;
    for section in sections.iter_mut() {
        for sample in buf.samples.iter_mut() {
            *sample = section.run(*sample);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 48_000;

    fn sine(freq: f32, secs: f32, amplitude: f32) -> AudioBuffer {
        let n = (secs * RATE as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin()
            })
            .collect();
        AudioBuffer::new(samples, RATE)
    }

    fn energy(buf: &AudioBuffer) -> f64 {
        buf.samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
    }

    #[test]
    fn design_rejects_bad_bands() {
        assert!(matches!(
            FilterSpec::design(6, 0.0, 2800.0, RATE),
            Err(ClarionError::InvalidBand(_))
        ));
        assert!(matches!(
            FilterSpec::design(6, 2800.0, 500.0, RATE),
            Err(ClarionError::InvalidBand(_))
        ));
        assert!(matches!(
            FilterSpec::design(6, 500.0, 24_000.0, RATE),
            Err(ClarionError::InvalidBand(_))
        ));
        assert!(matches!(
            FilterSpec::design(5, 500.0, 2800.0, RATE),
            Err(ClarionError::InvalidBand(_))
        ));
    }

    #[test]
    fn zeros_stay_zeros() {
        let spec = FilterSpec::design(6, 500.0, 2800.0, RATE).unwrap();
        let mut buf = AudioBuffer::new(vec![0.0; 9600], RATE);
        apply(&mut buf, &spec).unwrap();
        assert!(buf.samples.iter().all(|&s| s == 0.0));
        assert_eq!(buf.len(), 9600);
    }

    #[test]
    fn in_band_sine_passes_with_bounded_attenuation() {
        let spec = FilterSpec::design(6, 500.0, 2800.0, RATE).unwrap();
        let input = sine(1000.0, 1.0, 0.5);
        let mut out = input.clone();
        apply(&mut out, &spec).unwrap();

        assert_eq!(out.len(), input.len());
        let ratio = energy(&out) / energy(&input);
        assert!(ratio > 0.8, "in-band energy ratio {ratio} too low");
    }

    #[test]
    fn out_of_band_sine_attenuated_at_least_20_db() {
        let spec = FilterSpec::design(6, 500.0, 2800.0, RATE).unwrap();
        let input = sine(100.0, 1.0, 0.5);
        let mut out = input.clone();
        apply(&mut out, &spec).unwrap();

        // 20 dB power attenuation is an energy ratio below 0.01.
        let ratio = energy(&out) / energy(&input);
        assert!(ratio < 0.01, "out-of-band energy ratio {ratio} too high");
    }

    #[test]
    fn apply_rejects_rate_mismatch() {
        let spec = FilterSpec::design(6, 500.0, 2800.0, RATE).unwrap();
        let mut buf = AudioBuffer::new(vec![0.0; 480], 16_000);
        assert!(matches!(
            apply(&mut buf, &spec),
            Err(ClarionError::InvalidSignal(_))
        ));
    }
}

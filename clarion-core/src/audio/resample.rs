//! Sample-rate conversion between the device rate and the working rate.
//!
//! Devices deliver audio at whatever rate the OS negotiated (often 44.1 or
//! 48 kHz); the cleaning chain runs at one fixed working rate. The
//! conversion happens on the collector thread, never in the capture
//! callback, so allocation is allowed here.
//!
//! When the two rates already match no rubato session is created and
//! `convert` is a plain copy.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};

use crate::error::{ClarionError, Result};

/// Converts mono f32 audio from a source rate to the working rate.
pub struct RateAdapter {
    /// `None` in passthrough mode (source rate == working rate).
    session: Option<FastFixedIn<f32>>,
    /// Holds partial input between calls; rubato consumes fixed chunks.
    pending: Vec<f32>,
    chunk_size: usize,
    /// Pre-allocated `[1][output_frames_max]` output buffer.
    scratch: Vec<Vec<f32>>,
}

impl RateAdapter {
    /// # Parameters
    /// - `source_rate`: rate of the incoming audio (Hz).
    /// - `working_rate`: rate the rest of the system runs at (Hz).
    /// - `chunk_size`: input frames consumed per rubato call.
    ///
    /// # Errors
    /// `ClarionError::AudioDevice` if rubato rejects the configuration.
    pub fn new(source_rate: u32, working_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == working_rate {
            return Ok(Self {
                session: None,
                pending: Vec::new(),
                chunk_size,
                scratch: Vec::new(),
            });
        }

        let ratio = working_rate as f64 / source_rate as f64;
        let session = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio, no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| ClarionError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = session.output_frames_max();
        tracing::info!(source_rate, working_rate, chunk_size, max_out, "resampling enabled");

        Ok(Self {
            session: Some(session),
            pending: Vec::new(),
            chunk_size,
            scratch: vec![vec![0f32; max_out]],
        })
    }

    /// Convert incoming samples, returning output at the working rate (may
    /// be empty while input accumulates below one chunk).
    pub fn convert(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut session) = self.session else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        let mut result = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let input = &self.pending[..self.chunk_size];
            match session.process_into_buffer(&[input], &mut self.scratch, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.scratch[0][..produced]);
                }
                Err(e) => {
                    tracing::error!("resampler process error: {e}");
                }
            }
            self.pending.drain(..self.chunk_size);
        }
        result
    }

    pub fn is_passthrough(&self) -> bool {
        self.session.is_none()
    }
}

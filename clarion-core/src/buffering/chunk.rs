//! Value types shared across the capture and cleaning sides.

/// A finite mono signal at a fixed sample rate.
///
/// Samples are expected to stay in [-1.0, 1.0]; intermediate DSP stages may
/// temporarily exceed that range and rely on a later normalize to re-bound it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Mono f32 samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz. Fixed for the lifetime of the buffer.
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// An empty buffer at the given rate.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value, 0.0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Root-mean-square level, 0.0 for an empty buffer.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f32).sqrt()
    }
}

/// A short run of mono samples handed from the capture side to the
/// [`StreamingFrameBuffer`](crate::buffering::stream::StreamingFrameBuffer).
///
/// Owned by the producer until appended; the buffer owns it afterwards.
#[derive(Debug, Clone)]
pub struct FrameChunk {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz the producer captured at.
    pub sample_rate: u32,
}

impl FrameChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn peak_and_rms_of_known_signal() {
        let buf = AudioBuffer::new(vec![0.5, -0.5, 0.5, -0.5], 48_000);
        assert_abs_diff_eq!(buf.peak(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(buf.rms(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn empty_buffer_is_silent() {
        let buf = AudioBuffer::empty(48_000);
        assert!(buf.is_empty());
        assert_eq!(buf.peak(), 0.0);
        assert_eq!(buf.rms(), 0.0);
    }

    #[test]
    fn duration_follows_rate() {
        let buf = AudioBuffer::new(vec![0.0; 96_000], 48_000);
        assert_abs_diff_eq!(buf.duration_secs(), 2.0, epsilon = 1e-9);
    }
}

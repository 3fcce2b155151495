//! Stateless amplitude stages: peak normalization and clipped gain.

use crate::buffering::chunk::AudioBuffer;

/// Scale the buffer so its peak absolute amplitude equals `target`.
///
/// An all-zero buffer is returned unchanged — silence has no peak to scale
/// by and is not an error. Applying normalize twice with the same target is
/// a no-op on the second pass (up to rounding).
pub fn normalize(buf: &mut AudioBuffer, target: f32) {
    let peak = buf.peak();
    if peak == 0.0 {
        return;
    }
    let scale = target / peak;
    for sample in buf.samples.iter_mut() {
        *sample *= scale;
    }
}

/// Multiply every sample by `gain`, hard-clipping the result to [-1.0, 1.0].
pub fn amplify(buf: &mut AudioBuffer, gain: f32) {
    for sample in buf.samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn buffer(samples: Vec<f32>) -> AudioBuffer {
        AudioBuffer::new(samples, 48_000)
    }

    #[test]
    fn normalize_hits_target_peak() {
        let mut buf = buffer(vec![0.1, -0.25, 0.05]);
        normalize(&mut buf, 0.9);
        assert_abs_diff_eq!(buf.peak(), 0.9, epsilon = 1e-6);
        // Relative shape preserved
        assert_abs_diff_eq!(buf.samples[0], 0.36, epsilon = 1e-6);
        assert_abs_diff_eq!(buf.samples[2], 0.18, epsilon = 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_untouched() {
        let mut buf = buffer(vec![0.0; 64]);
        normalize(&mut buf, 0.9);
        assert!(buf.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut once = buffer(vec![0.3, -0.7, 0.2, 0.55]);
        normalize(&mut once, 0.9);
        let mut twice = once.clone();
        normalize(&mut twice, 0.9);
        for (a, b) in once.samples.iter().zip(&twice.samples) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn amplify_hard_clips_to_unit_range() {
        let mut buf = buffer(vec![0.8, -0.9, 0.3, -0.1]);
        amplify(&mut buf, 2.0);
        assert!(buf.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert_abs_diff_eq!(buf.samples[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buf.samples[1], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buf.samples[2], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(buf.samples[3], -0.2, epsilon = 1e-6);
    }
}

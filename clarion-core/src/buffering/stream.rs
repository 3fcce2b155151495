//! Accumulates capture chunks and serves trailing-window snapshots.
//!
//! One producer (the collector thread) appends, one consumer takes
//! snapshots or resets; both go through a `parking_lot::Mutex` with short
//! critical sections, so a snapshot can never observe a half-written chunk
//! and an append is never blocked for longer than one concatenation.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffering::chunk::{AudioBuffer, FrameChunk};
use crate::error::{ClarionError, Result};

/// Thread-safe, bounded accumulator of [`FrameChunk`]s from a live capture.
///
/// History is pruned to roughly the configured retention window: whole
/// chunks older than `max_window_secs` are dropped as new ones arrive, so a
/// long-running capture holds a bounded amount of memory. `snapshot` then
/// cuts the exact trailing window from what is retained.
pub struct StreamingFrameBuffer {
    inner: Mutex<State>,
    sample_rate: u32,
    /// Retention cap in samples, derived from `max_window_secs`.
    cap_samples: usize,
}

struct State {
    chunks: VecDeque<FrameChunk>,
    total_samples: usize,
}

impl StreamingFrameBuffer {
    /// Create an empty buffer for one capture session.
    ///
    /// `max_window_secs` bounds retained history; it should be at least the
    /// largest window `snapshot` will be asked for.
    pub fn new(sample_rate: u32, max_window_secs: f32) -> Self {
        let cap_samples = (max_window_secs as f64 * sample_rate as f64).ceil() as usize;
        Self {
            inner: Mutex::new(State {
                chunks: VecDeque::new(),
                total_samples: 0,
            }),
            sample_rate,
            cap_samples,
        }
    }

    /// Sample rate all chunks in this buffer share.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Append a chunk to the tail. O(1) amortized; never blocks longer than
    /// a concurrent snapshot's concatenation.
    ///
    /// # Errors
    /// `ClarionError::InvalidSignal` if the chunk's rate differs from the
    /// buffer's — chunks at mixed rates must never be silently concatenated.
    pub fn append(&self, chunk: FrameChunk) -> Result<()> {
        if chunk.sample_rate != self.sample_rate {
            return Err(ClarionError::InvalidSignal(format!(
                "chunk rate {} Hz does not match buffer rate {} Hz",
                chunk.sample_rate, self.sample_rate
            )));
        }
        if chunk.is_empty() {
            return Ok(());
        }

        let mut state = self.inner.lock();
        state.total_samples += chunk.len();
        state.chunks.push_back(chunk);

        // Drop whole chunks that fall entirely outside the retention window.
        while let Some(front) = state.chunks.front() {
            if state.total_samples - front.len() >= self.cap_samples {
                let dropped = state.chunks.pop_front().map(|c| c.len()).unwrap_or(0);
                state.total_samples -= dropped;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Total accumulated samples currently retained.
    pub fn total_samples(&self) -> usize {
        self.inner.lock().total_samples
    }

    /// Duration of retained history in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_samples() as f64 / self.sample_rate as f64
    }

    /// Concatenate retained chunks in arrival order and return the trailing
    /// `min(total, max_secs)` window as one [`AudioBuffer`].
    ///
    /// Deterministic: the result depends only on the appended content, not
    /// on when the call lands relative to the last `append`.
    ///
    /// # Errors
    /// - `ClarionError::NoCaptureData` if nothing has been appended.
    /// - `ClarionError::InsufficientDuration` if less than `min_secs` of
    ///   audio has accumulated.
    pub fn snapshot(&self, min_secs: f32, max_secs: f32) -> Result<AudioBuffer> {
        let state = self.inner.lock();

        if state.chunks.is_empty() {
            return Err(ClarionError::NoCaptureData);
        }

        let min_samples = (min_secs as f64 * self.sample_rate as f64).ceil() as usize;
        if state.total_samples < min_samples {
            return Err(ClarionError::InsufficientDuration {
                captured_secs: state.total_samples as f32 / self.sample_rate as f32,
                required_secs: min_secs,
            });
        }

        let window = (max_secs as f64 * self.sample_rate as f64).floor() as usize;
        let take = state.total_samples.min(window);
        let skip = state.total_samples - take;

        let mut samples = Vec::with_capacity(take);
        let mut remaining_skip = skip;
        for chunk in &state.chunks {
            if remaining_skip >= chunk.len() {
                remaining_skip -= chunk.len();
                continue;
            }
            samples.extend_from_slice(&chunk.samples[remaining_skip..]);
            remaining_skip = 0;
        }
        debug_assert_eq!(samples.len(), take);

        debug!(
            total = state.total_samples,
            returned = samples.len(),
            "snapshot taken"
        );
        Ok(AudioBuffer::new(samples, self.sample_rate))
    }

    /// Drop all retained chunks; used when a new capture session begins.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.chunks.clear();
        state.total_samples = 0;
    }
}

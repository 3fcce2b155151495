//! Where a window of audio comes from.
//!
//! The cleaning pipeline does not care whether its input was just captured
//! from a microphone or loaded from disk; [`FrameSource`] is the seam.

use std::sync::Arc;

use crate::buffering::chunk::AudioBuffer;
use crate::buffering::stream::StreamingFrameBuffer;
use crate::error::{ClarionError, Result};

/// Anything that can produce one window of mono audio to clean.
pub trait FrameSource {
    fn acquire(&self) -> Result<AudioBuffer>;
}

/// A finite, already-loaded buffer (typically a WAV file).
pub struct FileSource {
    buffer: AudioBuffer,
}

impl FileSource {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self { buffer }
    }
}

impl FrameSource for FileSource {
    /// # Errors
    /// `ClarionError::NoCaptureData` if the buffer is empty.
    fn acquire(&self) -> Result<AudioBuffer> {
        if self.buffer.is_empty() {
            return Err(ClarionError::NoCaptureData);
        }
        Ok(self.buffer.clone())
    }
}

/// The trailing window of a live capture session.
pub struct LiveSource {
    frames: Arc<StreamingFrameBuffer>,
    min_secs: f32,
    max_secs: f32,
}

impl LiveSource {
    pub fn new(frames: Arc<StreamingFrameBuffer>, min_secs: f32, max_secs: f32) -> Self {
        Self {
            frames,
            min_secs,
            max_secs,
        }
    }
}

impl FrameSource for LiveSource {
    /// Snapshot the trailing window; see
    /// [`StreamingFrameBuffer::snapshot`] for the error contract.
    fn acquire(&self) -> Result<AudioBuffer> {
        self.frames.snapshot(self.min_secs, self.max_secs)
    }
}

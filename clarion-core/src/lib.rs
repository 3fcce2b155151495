//! # clarion-core
//!
//! Reusable microphone capture and audio cleaning engine.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → MicCapture → SPSC RingBuffer → Collector(spawn_blocking)
//!                                                  │ resample
//!                                         StreamingFrameBuffer
//!                                                  │ snapshot (trailing window)
//!                                          CleaningPipeline
//!                               normalize → denoise → band-pass → amplify → normalize
//! ```
//!
//! The audio callback is zero-alloc. All heap work happens on the collector
//! thread or in the caller of `process()`.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod events;
pub mod source;
pub mod wav;

// Convenience re-exports for downstream crates
pub use buffering::chunk::{AudioBuffer, FrameChunk};
pub use buffering::stream::StreamingFrameBuffer;
pub use dsp::pipeline::{CleaningPipeline, PipelineResult};
pub use dsp::{DenoiseConfig, DspConfig};
pub use engine::{ClarionEngine, EngineConfig};
pub use error::ClarionError;
pub use events::{LevelEvent, RecorderStatus, StatusEvent};
pub use source::{FileSource, FrameSource, LiveSource};

//! Sample hand-off between the capture callback and the collector thread.
//!
//! Two layers, each with a single job:
//!
//! 1. A lock-free SPSC ring (`ringbuf::HeapRb<f32>`) whose wait-free
//!    `push_slice` is safe to call from the real-time audio callback.
//! 2. The [`stream::StreamingFrameBuffer`], a mutex-guarded chunk sequence
//!    the collector appends to and the snapshot operation reads from.

pub mod chunk;
pub mod stream;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

/// Producer half of the capture ring — held by the audio callback.
pub type CaptureProducer = ringbuf::HeapProd<f32>;

/// Consumer half of the capture ring — held by the collector thread.
pub type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Ring capacity: 2^21 = 2 097 152 f32 samples ≈ 43.7 s at 48 kHz.
/// Far more headroom than the collector's drain cadence ever needs.
pub const RING_CAPACITY: usize = 1 << 21;

/// Create a matched producer/consumer pair backed by a heap ring buffer.
pub fn create_capture_ring() -> (CaptureProducer, CaptureConsumer) {
    HeapRb::<f32>::new(RING_CAPACITY).split()
}

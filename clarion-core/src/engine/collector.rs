//! Blocking collector loop.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Drain the capture ring → raw f32 slice at the device rate
//! 2. Resample to the working rate (passthrough when rates match)
//! 3. Append one FrameChunk to the shared StreamingFrameBuffer
//! 4. Broadcast a LevelEvent (rms + peak) for live metering
//! ```
//!
//! The loop runs inside `spawn_blocking`, keeping the Tokio executor free.
//! When the running flag drops it drains whatever the ring still holds so
//! the tail of the capture is not lost.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::audio::resample::RateAdapter;
use crate::buffering::chunk::FrameChunk;
use crate::buffering::stream::StreamingFrameBuffer;
use crate::buffering::{CaptureConsumer, Consumer};
use crate::events::LevelEvent;

/// Samples drained from the ring per iteration: 20 ms at 48 kHz.
const DRAIN_CHUNK: usize = 960;

/// Sleep when the ring is empty (avoids busy-wait burning a core).
const SLEEP_EMPTY_MS: u64 = 5;

/// Counters shared with the engine for observability.
#[derive(Default)]
pub struct CollectorStats {
    pub samples_in: AtomicUsize,
    pub samples_collected: AtomicUsize,
    pub chunks_appended: AtomicUsize,
}

impl CollectorStats {
    pub fn reset(&self) {
        self.samples_in.store(0, Ordering::Relaxed);
        self.samples_collected.store(0, Ordering::Relaxed);
        self.chunks_appended.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_in: self.samples_in.load(Ordering::Relaxed),
            samples_collected: self.samples_collected.load(Ordering::Relaxed),
            chunks_appended: self.chunks_appended.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    /// Samples drained from the ring at the device rate.
    pub samples_in: usize,
    /// Samples appended to the frame buffer at the working rate.
    pub samples_collected: usize,
    pub chunks_appended: usize,
}

/// Everything the collector needs, passed as one struct so the
/// `spawn_blocking` closure stays tidy.
pub struct CollectorContext {
    pub consumer: CaptureConsumer,
    pub running: Arc<AtomicBool>,
    pub frames: Arc<StreamingFrameBuffer>,
    pub level_tx: broadcast::Sender<LevelEvent>,
    pub capture_sample_rate: u32,
    pub stats: Arc<CollectorStats>,
}

/// Run the collector until `ctx.running` becomes false, then drain the ring
/// one last time.
pub fn run(mut ctx: CollectorContext) {
    info!(
        capture_rate = ctx.capture_sample_rate,
        working_rate = ctx.frames.sample_rate(),
        "collector started"
    );

    let mut adapter = match RateAdapter::new(
        ctx.capture_sample_rate,
        ctx.frames.sample_rate(),
        DRAIN_CHUNK,
    ) {
        Ok(a) => a,
        Err(e) => {
            error!("failed to create resampler: {e}");
            ctx.running.store(false, Ordering::SeqCst);
            return;
        }
    };

    let mut raw = vec![0f32; DRAIN_CHUNK];
    let mut level_seq = 0u64;

    loop {
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        let n = ctx.consumer.pop_slice(&mut raw);
        if n == 0 {
            std::thread::sleep(std::time::Duration::from_millis(SLEEP_EMPTY_MS));
            continue;
        }

        if !collect(&mut ctx, &mut adapter, &raw[..n], &mut level_seq) {
            break;
        }
    }

    // Terminal drain: the device may have pushed frames between the last
    // iteration and the flag flip.
    loop {
        let n = ctx.consumer.pop_slice(&mut raw);
        if n == 0 {
            break;
        }
        if !collect(&mut ctx, &mut adapter, &raw[..n], &mut level_seq) {
            break;
        }
    }

    let snap = ctx.stats.snapshot();
    info!(
        samples_in = snap.samples_in,
        samples_collected = snap.samples_collected,
        chunks_appended = snap.chunks_appended,
        "collector stopped"
    );
}

/// One drained slice through resample → append → level event.
/// Returns false on an unrecoverable append error.
fn collect(
    ctx: &mut CollectorContext,
    adapter: &mut RateAdapter,
    raw: &[f32],
    level_seq: &mut u64,
) -> bool {
    ctx.stats.samples_in.fetch_add(raw.len(), Ordering::Relaxed);

    let converted = adapter.convert(raw);
    if converted.is_empty() {
        // Partial chunk, rubato is still accumulating input.
        return true;
    }

    let rms = {
        let sum_sq = converted.iter().map(|s| s * s).sum::<f32>();
        (sum_sq / converted.len() as f32).sqrt()
    };
    let peak = converted.iter().fold(0f32, |acc, s| acc.max(s.abs()));

    ctx.stats
        .samples_collected
        .fetch_add(converted.len(), Ordering::Relaxed);

    let chunk = FrameChunk::new(converted, ctx.frames.sample_rate());
    if let Err(e) = ctx.frames.append(chunk) {
        error!("frame buffer append failed: {e}");
        ctx.running.store(false, Ordering::SeqCst);
        return false;
    }
    ctx.stats.chunks_appended.fetch_add(1, Ordering::Relaxed);

    let _ = ctx.level_tx.send(LevelEvent {
        seq: *level_seq,
        rms,
        peak,
    });
    *level_seq = level_seq.saturating_add(1);

    if *level_seq % 50 == 0 {
        debug!(
            rms = format_args!("{rms:.4}"),
            buffered_secs = format_args!("{:.2}", ctx.frames.duration_secs()),
            "collector level check"
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::{Duration, Instant};

    use tokio::sync::broadcast::error::TryRecvError;

    use crate::buffering::{create_capture_ring, Producer};

    const RATE: u32 = 48_000;

    fn context(
        consumer: CaptureConsumer,
        running: Arc<AtomicBool>,
        frames: Arc<StreamingFrameBuffer>,
    ) -> (CollectorContext, broadcast::Receiver<LevelEvent>) {
        let (level_tx, level_rx) = broadcast::channel(64);
        let ctx = CollectorContext {
            consumer,
            running,
            frames,
            level_tx,
            capture_sample_rate: RATE,
            stats: Arc::new(CollectorStats::default()),
        };
        (ctx, level_rx)
    }

    fn wait_for_samples(frames: &StreamingFrameBuffer, at_least: usize, timeout: Duration) {
        let start = Instant::now();
        while frames.total_samples() < at_least {
            if start.elapsed() >= timeout {
                panic!(
                    "timed out: {} of {at_least} samples collected",
                    frames.total_samples()
                );
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn collects_pushed_samples_into_the_frame_buffer() {
        let (mut producer, consumer) = create_capture_ring();
        producer.push_slice(&vec![0.25f32; DRAIN_CHUNK * 4]);

        let running = Arc::new(AtomicBool::new(true));
        let frames = Arc::new(StreamingFrameBuffer::new(RATE, 10.0));
        let (ctx, _level_rx) = context(consumer, Arc::clone(&running), Arc::clone(&frames));
        let stats = Arc::clone(&ctx.stats);

        let handle = thread::spawn(move || run(ctx));
        wait_for_samples(&frames, DRAIN_CHUNK * 4, Duration::from_secs(1));

        running.store(false, Ordering::SeqCst);
        handle.join().expect("collector thread panicked");

        let snap = stats.snapshot();
        assert_eq!(snap.samples_in, DRAIN_CHUNK * 4);
        assert_eq!(snap.samples_collected, DRAIN_CHUNK * 4);
        assert_eq!(snap.chunks_appended, 4);
        assert_eq!(frames.total_samples(), DRAIN_CHUNK * 4);
    }

    #[test]
    fn emits_level_events_with_increasing_seq() {
        let (mut producer, consumer) = create_capture_ring();
        producer.push_slice(&vec![0.5f32; DRAIN_CHUNK * 2]);

        let running = Arc::new(AtomicBool::new(true));
        let frames = Arc::new(StreamingFrameBuffer::new(RATE, 10.0));
        let (ctx, mut level_rx) = context(consumer, Arc::clone(&running), Arc::clone(&frames));

        let handle = thread::spawn(move || run(ctx));
        wait_for_samples(&frames, DRAIN_CHUNK * 2, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("collector thread panicked");

        let mut events = Vec::new();
        loop {
            match level_rx.try_recv() {
                Ok(ev) => events.push(ev),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 0);
        assert_eq!(events[1].seq, 1);
        // Constant 0.5 signal: rms == peak == 0.5.
        assert!((events[0].rms - 0.5).abs() < 1e-5);
        assert!((events[0].peak - 0.5).abs() < 1e-5);
    }

    #[test]
    fn terminal_drain_keeps_the_capture_tail() {
        let (mut producer, consumer) = create_capture_ring();

        // Flag is already down; everything must come from the terminal drain.
        let running = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(StreamingFrameBuffer::new(RATE, 10.0));
        producer.push_slice(&vec![0.1f32; DRAIN_CHUNK * 3]);

        let (ctx, _level_rx) = context(consumer, running, Arc::clone(&frames));
        run(ctx);

        assert_eq!(frames.total_samples(), DRAIN_CHUNK * 3);
    }
}

//! `ClarionEngine` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! ClarionEngine::new()
//!     └─► start()        → mic open, collector spawned, status = Recording
//!         └─► process()  → snapshot trailing window, run cleaning chain
//!         └─► stop()     → running=false, stream dropped, status = Stopped
//! ```
//!
//! `start()`/`stop()` in the wrong state return an error rather than
//! panicking. `process()` may be called while recording or after `stop()`;
//! it reads whatever the frame buffer holds at that moment.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread
//! affinity). `MicCapture` is therefore created *inside* the
//! `spawn_blocking` closure so it never crosses a thread boundary. A
//! bounded channel propagates the open-device outcome back to the `start()`
//! caller.

pub mod collector;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    audio::MicCapture,
    buffering::{create_capture_ring, stream::StreamingFrameBuffer},
    dsp::{
        pipeline::{CleaningPipeline, PipelineResult},
        DspConfig,
    },
    error::{ClarionError, Result},
    events::{LevelEvent, RecorderStatus, StatusEvent},
    source::{FrameSource, LiveSource},
};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `ClarionEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rate the frame buffer and cleaning chain run at (Hz). Audio captured
    /// at other device rates is resampled. Default: 48000.
    pub working_sample_rate: u32,
    /// Minimum captured duration before `process()` succeeds. Default: 2.0.
    pub min_record_secs: f32,
    /// Trailing window `process()` cleans; also bounds retained history.
    /// Default: 10.0.
    pub max_window_secs: f32,
    pub dsp: DspConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            working_sample_rate: 48_000,
            min_record_secs: 2.0,
            max_window_secs: 10.0,
            dsp: DspConfig::default(),
        }
    }
}

/// The top-level engine handle.
///
/// `ClarionEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<ClarionEngine>` to share between an application shell and
/// event-forwarding async tasks.
pub struct ClarionEngine {
    config: EngineConfig,
    pipeline: CleaningPipeline,
    /// `true` while capture + collector are active.
    running: Arc<AtomicBool>,
    /// Canonical status (written via Mutex, read from commands).
    status: Arc<Mutex<RecorderStatus>>,
    /// Frame history shared with the collector thread.
    frames: Arc<StreamingFrameBuffer>,
    status_tx: broadcast::Sender<StatusEvent>,
    level_tx: broadcast::Sender<LevelEvent>,
    stats: Arc<collector::CollectorStats>,
}

impl ClarionEngine {
    /// Create an engine. Does not open the microphone — call `start()`.
    ///
    /// # Errors
    /// `ClarionError::InvalidSignal` if the DSP configuration is degenerate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (level_tx, _) = broadcast::channel(BROADCAST_CAP);
        let frames = Arc::new(StreamingFrameBuffer::new(
            config.working_sample_rate,
            config.max_window_secs,
        ));
        let pipeline = CleaningPipeline::new(config.dsp)?;

        Ok(Self {
            config,
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(RecorderStatus::Idle)),
            frames,
            status_tx,
            level_tx,
            stats: Arc::new(collector::CollectorStats::default()),
        })
    }

    /// Start capturing from the system default microphone.
    ///
    /// Blocks until the device is confirmed open (or fails), then returns;
    /// the collector keeps running on a background blocking thread. Any
    /// history from a previous session is discarded.
    ///
    /// # Errors
    /// - `ClarionError::AlreadyRecording` if already started.
    /// - `ClarionError::NoDefaultInputDevice` / `AudioStream` on device
    ///   errors.
    pub fn start(&self) -> Result<()> {
        self.start_with_device(None)
    }

    /// Start capturing from a named input device, falling back to the
    /// default when the name does not resolve.
    pub fn start_with_device(&self, preferred_input_device: Option<String>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(ClarionError::AlreadyRecording);
        }

        self.stats.reset();
        self.frames.reset();
        self.running.store(true, Ordering::SeqCst);
        self.set_status(RecorderStatus::Recording, None);

        let (producer, consumer) = create_capture_ring();

        let running = Arc::clone(&self.running);
        let frames = Arc::clone(&self.frames);
        let level_tx = self.level_tx.clone();
        let stats = Arc::clone(&self.stats);

        // Bounded handshake: the collector thread reports whether the
        // device opened, carrying the capture rate on success.
        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<u32>>(1);

        tokio::task::spawn_blocking(move || {
            // Device must open on THIS thread — cpal::Stream is !Send.
            let capture = match MicCapture::open_with_preference(
                producer,
                Arc::clone(&running),
                preferred_input_device.as_deref(),
            ) {
                Ok(c) => {
                    let _ = open_tx.send(Ok(c.sample_rate));
                    c
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let capture_sample_rate = capture.sample_rate;
            collector::run(collector::CollectorContext {
                consumer,
                running,
                frames,
                level_tx,
                capture_sample_rate,
                stats,
            });

            // Stream drops here, releasing the device on this thread.
            drop(capture);
        });

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                info!(capture_rate = rate, "engine started — recording");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(RecorderStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message — spawn_blocking panicked?
                self.running.store(false, Ordering::SeqCst);
                self.set_status(RecorderStatus::Error, Some("capture failed to start".into()));
                Err(ClarionError::Other(anyhow::anyhow!(
                    "capture task died unexpectedly"
                )))
            }
        }
    }

    /// Stop capturing. Retained history stays available for `process()`.
    ///
    /// # Errors
    /// `ClarionError::NotRecording` if no capture is active.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ClarionError::NotRecording);
        }
        self.running.store(false, Ordering::SeqCst);
        self.set_status(RecorderStatus::Stopped, None);
        info!("engine stop requested");
        Ok(())
    }

    /// Discard all retained capture history.
    pub fn reset(&self) {
        self.frames.reset();
        if !self.running.load(Ordering::SeqCst) {
            self.set_status(RecorderStatus::Idle, None);
        }
    }

    /// Clean the trailing window of the current capture.
    ///
    /// # Errors
    /// - `ClarionError::NoCaptureData` when nothing has been captured.
    /// - `ClarionError::InsufficientDuration` below `min_record_secs`.
    /// - Any cleaning-stage error.
    pub fn process(&self) -> Result<PipelineResult> {
        let source = LiveSource::new(
            Arc::clone(&self.frames),
            self.config.min_record_secs,
            self.config.max_window_secs,
        );
        self.pipeline.clean(source.acquire()?)
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> RecorderStatus {
        *self.status.lock()
    }

    /// Seconds of audio currently retained.
    pub fn captured_secs(&self) -> f64 {
        self.frames.duration_secs()
    }

    /// Shared frame history; lets embedders feed audio directly when no
    /// microphone backend is compiled in.
    pub fn frame_buffer(&self) -> Arc<StreamingFrameBuffer> {
        Arc::clone(&self.frames)
    }

    /// Subscribe to lifecycle status events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to live level events (rms + peak per collected chunk).
    pub fn subscribe_levels(&self) -> broadcast::Receiver<LevelEvent> {
        self.level_tx.subscribe()
    }

    /// Snapshot of collector counters for observability.
    pub fn collector_stats(&self) -> collector::StatsSnapshot {
        self.stats.snapshot()
    }

    fn set_status(&self, new_status: RecorderStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(StatusEvent {
            status: new_status,
            detail,
        });
    }
}

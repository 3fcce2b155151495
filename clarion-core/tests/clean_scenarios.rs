//! End-to-end scenarios through the engine: feed frames, snapshot the
//! trailing window, run the cleaning chain, and check the output against
//! what a listener would expect.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rustfft::{num_complex::Complex, FftPlanner};

use clarion_core::{ClarionEngine, ClarionError, EngineConfig, FrameChunk};

const RATE: u32 = 48_000;

fn sine_chunk(freq: f32, start_sample: usize, len: usize, amplitude: f32) -> FrameChunk {
    let samples = (start_sample..start_sample + len)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
        .collect();
    FrameChunk::new(samples, RATE)
}

/// Frequency of the strongest FFT bin in the signal.
fn dominant_frequency(samples: &[f32], rate: u32) -> f32 {
    let n = samples.len();
    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::<f32>::new().plan_fft_forward(n).process(&mut buf);

    let (bin, _) = buf[1..n / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm()))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .expect("non-empty spectrum");
    bin as f32 * rate as f32 / n as f32
}

#[test]
fn short_capture_is_rejected_with_durations() {
    let engine = ClarionEngine::new(EngineConfig::default()).unwrap();
    engine
        .frame_buffer()
        .append(sine_chunk(1000.0, 0, (RATE as usize * 3) / 2, 0.1))
        .unwrap();

    match engine.process() {
        Err(ClarionError::InsufficientDuration {
            captured_secs,
            required_secs,
        }) => {
            assert!((captured_secs - 1.5).abs() < 1e-3);
            assert!((required_secs - 2.0).abs() < 1e-6);
        }
        other => panic!("expected InsufficientDuration, got {other:?}"),
    }
}

#[test]
fn long_capture_cleans_exactly_the_trailing_window() {
    let engine = ClarionEngine::new(EngineConfig::default()).unwrap();
    let frames = engine.frame_buffer();

    // 12 s appended in 0.1 s chunks; only the last 10 s should be cleaned.
    let chunk_len = 4_800;
    let total = RATE as usize * 12;
    let mut appended = 0;
    while appended < total {
        frames
            .append(sine_chunk(1000.0, appended, chunk_len, 0.1))
            .unwrap();
        appended += chunk_len;
    }

    let result = engine.process().unwrap();
    assert_eq!(result.original.len(), RATE as usize * 10);
    assert_eq!(result.cleaned.len(), RATE as usize * 10);
    assert_eq!(result.cleaned.sample_rate, RATE);
}

#[test]
fn quiet_tone_comes_out_normalized_and_on_frequency() {
    let engine = ClarionEngine::new(EngineConfig::default()).unwrap();
    engine
        .frame_buffer()
        .append(sine_chunk(1000.0, 0, RATE as usize * 3, 0.1))
        .unwrap();

    let result = engine.process().unwrap();
    let cleaned = &result.cleaned;

    assert_eq!(cleaned.len(), RATE as usize * 3);
    // Final normalize stage targets 0.9.
    assert!(
        (cleaned.peak() - 0.9).abs() < 1e-3,
        "peak {} not at target",
        cleaned.peak()
    );
    // 1000 Hz sits inside the 500–2800 Hz band and must survive the chain.
    let dominant = dominant_frequency(&cleaned.samples, RATE);
    assert!(
        (dominant - 1000.0).abs() < 20.0,
        "dominant frequency drifted to {dominant} Hz"
    );
    // Original input stays untouched for A/B comparison.
    assert!((result.original.peak() - 0.1).abs() < 1e-3);
}

#[test]
fn processing_succeeds_while_a_producer_is_still_appending() {
    let engine = Arc::new(ClarionEngine::new(EngineConfig::default()).unwrap());
    let frames = engine.frame_buffer();

    let producer = thread::spawn(move || {
        let chunk_len = 4_800;
        for i in 0..60 {
            frames
                .append(sine_chunk(1000.0, i * chunk_len, chunk_len, 0.1))
                .unwrap();
            thread::sleep(Duration::from_millis(1));
        }
    });

    // Keep asking until enough audio has accumulated; every answer along
    // the way must be one of the documented outcomes.
    let deadline = Instant::now() + Duration::from_secs(10);
    let result = loop {
        match engine.process() {
            Ok(result) => break result,
            Err(ClarionError::NoCaptureData | ClarionError::InsufficientDuration { .. }) => {
                assert!(Instant::now() < deadline, "never accumulated 2 s of audio");
                thread::sleep(Duration::from_millis(5));
            }
            Err(e) => panic!("unexpected process error: {e}"),
        }
    };

    producer.join().expect("producer panicked");

    assert!(result.cleaned.len() >= RATE as usize * 2);
    assert!((result.cleaned.peak() - 0.9).abs() < 1e-3);
}

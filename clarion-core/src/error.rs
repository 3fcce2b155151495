use thiserror::Error;

/// All errors produced by clarion-core.
#[derive(Debug, Error)]
pub enum ClarionError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("captured {captured_secs:.2}s, need at least {required_secs:.2}s")]
    InsufficientDuration {
        captured_secs: f32,
        required_secs: f32,
    },

    #[error("no capture data accumulated")]
    NoCaptureData,

    #[error("invalid filter band: {0}")]
    InvalidBand(String),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("capture is already running")]
    AlreadyRecording,

    #[error("capture is not running")]
    NotRecording,

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ClarionError>;

//! Event types broadcast to external collaborators (UI shells, meters).
//!
//! All types are serde camelCase so a frontend can consume them directly
//! off whatever transport the embedding application uses.

use serde::{Deserialize, Serialize};

/// Emitted whenever the engine's lifecycle state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: RecorderStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the capture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Actively capturing audio into the frame buffer.
    Recording,
    /// Capture stopped; snapshot/clean may still be triggered.
    Stopped,
    /// Unrecoverable capture error — restart required.
    Error,
}

/// Emitted per collected chunk so collaborators can render a live meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Root-mean-square level of the chunk in [0.0, 1.0].
    pub rms: f32,
    /// Peak absolute sample of the chunk in [0.0, 1.0].
    pub peak: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = StatusEvent {
            status: RecorderStatus::Recording,
            detail: Some("mic open".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "recording");
        assert_eq!(json["detail"], "mic open");

        let round_trip: StatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, RecorderStatus::Recording);
        assert_eq!(round_trip.detail.as_deref(), Some("mic open"));
    }

    #[test]
    fn level_event_serializes_with_camel_case_fields() {
        let event = LevelEvent {
            seq: 11,
            rms: 0.04,
            peak: 0.21,
        };

        let json = serde_json::to_value(&event).expect("serialize level event");
        assert_eq!(json["seq"], 11);
        let rms = json["rms"].as_f64().expect("rms should be a number");
        assert!((rms - 0.04).abs() < 1e-6);
        let peak = json["peak"].as_f64().expect("peak should be a number");
        assert!((peak - 0.21).abs() < 1e-6);
    }

    #[test]
    fn recorder_status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<RecorderStatus>(r#""Recording""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }
}

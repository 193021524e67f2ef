pub mod channel;
pub mod recorder;

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConsoleError;

pub use channel::{TelemetryChannel, TelemetryFeed, TelemetryLink, TelemetrySlot};

/// One detection as produced by the upstream detector. The record is passed
/// through untouched; the accessors only read the keys the console displays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionBox(Value);

impl DetectionBox {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn label(&self) -> Option<&str> {
        self.0.get("label").and_then(Value::as_str)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.0
            .get("confidence")
            .or_else(|| self.0.get("conf"))
            .and_then(Value::as_f64)
    }

    /// Bounding box as `[x1, y1, x2, y2]` in frame pixels.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let coord = |key: &str| self.0.get(key).and_then(Value::as_f64);
        Some([coord("x1")?, coord("y1")?, coord("x2")?, coord("y2")?])
    }
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    detections: Option<Vec<DetectionBox>>,
    #[serde(default)]
    ultrasonic_distance: Option<f64>,
}

/// A decoded telemetry message. Absent fields are already resolved to
/// their defaults: no frame, no detections, unknown distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryMessage {
    /// Encoded camera frame (JPEG from the robot's camera).
    pub frame: Option<Arc<[u8]>>,
    pub detections: Vec<DetectionBox>,
    pub ultrasonic_distance_cm: Option<f64>,
}

impl TelemetryMessage {
    pub fn decode(text: &str) -> Result<Self, ConsoleError> {
        let wire: WireMessage =
            serde_json::from_str(text).map_err(|e| ConsoleError::Decode { source: e })?;
        Self::from_wire(wire)
    }

    pub fn decode_slice(data: &[u8]) -> Result<Self, ConsoleError> {
        let wire: WireMessage =
            serde_json::from_slice(data).map_err(|e| ConsoleError::Decode { source: e })?;
        Self::from_wire(wire)
    }

    fn from_wire(wire: WireMessage) -> Result<Self, ConsoleError> {
        let frame = match wire.image {
            Some(image) if !image.is_empty() => Some(Arc::from(
                BASE64
                    .decode(image.as_bytes())
                    .map_err(|e| ConsoleError::InvalidFrame { source: e })?,
            )),
            _ => None,
        };

        Ok(Self {
            frame,
            detections: wire.detections.unwrap_or_default(),
            // the range sensor reports -1 when it has no valid reading
            ultrasonic_distance_cm: wire
                .ultrasonic_distance
                .filter(|distance| distance.is_finite() && *distance >= 0.),
        })
    }
}

/// Latest camera frame. `sequence` changes whenever a new frame arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub bytes: Arc<[u8]>,
    pub sequence: u64,
}

/// Latest-known telemetry. Overwritten by every message, no history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub frame: Option<Frame>,
    pub detections: Vec<DetectionBox>,
    pub ultrasonic_distance_cm: Option<f64>,
    pub messages_received: u64,
}

impl TelemetrySnapshot {
    /// Replaces detections and distance with the message's values. The frame
    /// is only replaced when the message carries one, so the last frame stays
    /// on screen between frame-less messages.
    pub fn apply(&mut self, message: TelemetryMessage) {
        self.apply_latest(message, 1);
    }

    /// Applies the newest of `received` messages that arrived since the last
    /// apply. The older ones were superseded before anyone looked at them.
    pub fn apply_latest(&mut self, message: TelemetryMessage, received: u64) {
        self.messages_received += received.max(1);
        if let Some(bytes) = message.frame {
            self.frame = Some(Frame {
                bytes,
                sequence: self.messages_received,
            });
        }
        self.detections = message.detections;
        self.ultrasonic_distance_cm = message.ultrasonic_distance_cm;
    }
}

/// Connection state changes reported by the telemetry channel. Messages
/// themselves travel through a [`TelemetrySlot`], never through this queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
    Connected,
    Closed { reason: Option<String> },
    Failed { reason: String },
}

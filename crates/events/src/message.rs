//! Messages pushed to real-time subscribers.

use fleetpulse_core::alert::Alert;
use fleetpulse_core::telemetry::TelemetrySample;
use serde::{Deserialize, Serialize};

/// A message delivered to the subscribers of one vehicle.
///
/// Serializes as `{"type": "telemetry", "data": <sample>}` or
/// `{"type": "alert", "data": [<alert>, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamMessage {
    /// A raw telemetry sample, optional readings omitted.
    Telemetry(TelemetrySample),
    /// A batch of alerts generated from (or submitted for) one event.
    Alert(Vec<Alert>),
}

impl StreamMessage {
    /// The value of the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Telemetry(_) => "telemetry",
            StreamMessage::Alert(_) => "alert",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

//! Telemetry samples and their wire-level validation.
//!
//! Callers submit a [`TelemetryPayload`] where every field is optional so
//! that missing mandatory fields surface as a [`CoreError::Validation`]
//! rather than an opaque deserialization failure. A successfully validated
//! payload becomes an immutable [`TelemetrySample`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::{Timestamp, VehicleId};

/// Three-axis accelerometer reading in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accelerometer {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Accelerometer {
    /// Euclidean magnitude of the acceleration vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One validated, timestamped reading from a vehicle's sensors.
///
/// Optional readings are omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub vehicle_id: VehicleId,
    pub timestamp: Timestamp,
    /// Speed in km/h.
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
    /// Fuel level as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_level: Option<f64>,
    /// Battery level as a percentage (EVs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    /// Engine temperature in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tire_pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<Accelerometer>,
}

/// Unvalidated telemetry as received from a sensor feed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TelemetryPayload {
    #[validate(required, length(min = 1, max = 128))]
    pub vehicle_id: Option<String>,
    /// RFC 3339 or naive ISO-8601; parsed during validation.
    #[validate(required, custom(function = "validate_timestamp"))]
    pub timestamp: Option<String>,
    #[validate(required, range(min = 0.0))]
    pub speed: Option<f64>,
    #[validate(required, range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(required, range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub rpm: Option<f64>,
    pub fuel_level: Option<f64>,
    pub battery_level: Option<f64>,
    pub engine_temp: Option<f64>,
    pub tire_pressure: Option<f64>,
    pub accelerometer: Option<Accelerometer>,
}

impl TryFrom<TelemetryPayload> for TelemetrySample {
    type Error = CoreError;

    fn try_from(payload: TelemetryPayload) -> Result<Self, Self::Error> {
        payload
            .validate()
            .map_err(|e| CoreError::from_validation(&e))?;

        let (Some(vehicle_id), Some(raw_timestamp), Some(speed), Some(latitude), Some(longitude)) = (
            payload.vehicle_id,
            payload.timestamp,
            payload.speed,
            payload.latitude,
            payload.longitude,
        ) else {
            return Err(CoreError::Validation("missing mandatory fields".into()));
        };
        let timestamp = parse_timestamp(&raw_timestamp)
            .map_err(|e| CoreError::Validation(format!("invalid timestamp: {e}")))?;

        Ok(TelemetrySample {
            vehicle_id,
            timestamp,
            speed,
            latitude,
            longitude,
            rpm: payload.rpm,
            fuel_level: payload.fuel_level,
            battery_level: payload.battery_level,
            engine_temp: payload.engine_temp,
            tire_pressure: payload.tire_pressure,
            accelerometer: payload.accelerometer,
        })
    }
}

/// Parse a sensor timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T12:00:00Z`) and naive ISO-8601 date-times
/// without an offset (`2024-01-01T12:00:00`), which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
    }
}

fn validate_timestamp(raw: &str) -> Result<(), ValidationError> {
    parse_timestamp(raw)
        .map(|_| ())
        .map_err(|_| ValidationError::new("timestamp"))
}

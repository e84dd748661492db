//! Built-in safety and maintenance rules.

use crate::alert::{Alert, AlertCategory, Severity};
use crate::rules::Rule;
use crate::telemetry::TelemetrySample;
use crate::types::Timestamp;

/// Flags sudden braking, acceleration or swerving from the accelerometer.
#[derive(Debug, Clone)]
pub struct HarshManeuver {
    threshold: f64,
}

impl HarshManeuver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Rule for HarshManeuver {
    fn name(&self) -> &'static str {
        "harsh_maneuver"
    }

    fn check(&self, sample: &TelemetrySample, now: Timestamp) -> Option<Alert> {
        let accel = sample.accelerometer?;
        if accel.magnitude() <= self.threshold {
            return None;
        }

        Some(
            Alert::new(
                sample.vehicle_id.clone(),
                AlertCategory::RashDriving,
                Severity::High,
                "Harsh driving maneuver detected!",
                now,
            )
            // Debug keeps the decimal point on whole coordinates ("12.0").
            .with_location(format!("{:?}, {:?}", sample.latitude, sample.longitude)),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Overspeed {
    limit_kmh: f64,
}

impl Overspeed {
    pub fn new(limit_kmh: f64) -> Self {
        Self { limit_kmh }
    }
}

impl Rule for Overspeed {
    fn name(&self) -> &'static str {
        "overspeed"
    }

    fn check(&self, sample: &TelemetrySample, now: Timestamp) -> Option<Alert> {
        if sample.speed <= self.limit_kmh {
            return None;
        }

        Some(
            Alert::new(
                sample.vehicle_id.clone(),
                AlertCategory::RashDriving,
                Severity::Medium,
                format!("Overspeeding detected: {} km/h", sample.speed),
                now,
            )
            .with_id_prefix("OS"),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LowBattery {
    min_pct: f64,
}

impl LowBattery {
    pub fn new(min_pct: f64) -> Self {
        Self { min_pct }
    }
}

impl Rule for LowBattery {
    fn name(&self) -> &'static str {
        "low_battery"
    }

    fn check(&self, sample: &TelemetrySample, now: Timestamp) -> Option<Alert> {
        let level = sample.battery_level?;
        if level >= self.min_pct {
            return None;
        }

        Some(Alert::new(
            sample.vehicle_id.clone(),
            AlertCategory::Maintenance,
            Severity::Medium,
            "Battery critically low. Recharge required soon.",
            now,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct Overheat {
    max_celsius: f64,
}

impl Overheat {
    pub fn new(max_celsius: f64) -> Self {
        Self { max_celsius }
    }
}

impl Rule for Overheat {
    fn name(&self) -> &'static str {
        "overheat"
    }

    fn check(&self, sample: &TelemetrySample, now: Timestamp) -> Option<Alert> {
        let temp = sample.engine_temp?;
        if temp <= self.max_celsius {
            return None;
        }

        Some(
            Alert::new(
                sample.vehicle_id.clone(),
                AlertCategory::Maintenance,
                Severity::Critical,
                "Engine overheating! Stop immediately.",
                now,
            )
            .with_id_prefix("ENG"),
        )
    }
}

//! Rule engine turning telemetry samples into alerts.
//!
//! All logic in this module is pure (no I/O, no wall clock): the caller
//! passes the evaluation time in so results are reproducible in tests.

pub mod builtin;

use std::fmt;

use crate::alert::Alert;
use crate::telemetry::TelemetrySample;
use crate::types::Timestamp;

pub use builtin::{HarshManeuver, LowBattery, Overheat, Overspeed};

/// A single independent classification rule.
pub trait Rule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Return an alert if `sample` violates this rule.
    fn check(&self, sample: &TelemetrySample, now: Timestamp) -> Option<Alert>;
}

/// Threshold values for the built-in rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleThresholds {
    /// Acceleration magnitude (m/s²) above which a maneuver counts as harsh.
    pub harsh_accel: f64,
    /// Speed (km/h) above which the vehicle is overspeeding.
    pub overspeed_kmh: f64,
    /// Battery percentage below which maintenance is required.
    pub low_battery_pct: f64,
    /// Engine temperature (°C) above which the engine is overheating.
    pub overheat_celsius: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            harsh_accel: 15.0,
            overspeed_kmh: 120.0,
            low_battery_pct: 20.0,
            overheat_celsius: 100.0,
        }
    }
}

/// Ordered collection of rules.
///
/// Alerts come out in rule order, so delivery order downstream is
/// deterministic for a given sample.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    /// An engine with no rules; it never emits alerts.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rule set: harsh maneuver, overspeed, low battery, overheat.
    pub fn standard(thresholds: &RuleThresholds) -> Self {
        Self::empty()
            .with_rule(HarshManeuver::new(thresholds.harsh_accel))
            .with_rule(Overspeed::new(thresholds.overspeed_kmh))
            .with_rule(LowBattery::new(thresholds.low_battery_pct))
            .with_rule(Overheat::new(thresholds.overheat_celsius))
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `sample` and collect the alerts that fire.
    pub fn evaluate(&self, sample: &TelemetrySample, now: Timestamp) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(sample, now))
            .collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard(&RuleThresholds::default())
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

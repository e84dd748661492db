//! Vehicle alerts raised by the rule engine or submitted by external callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::CoreError;
use crate::types::{Timestamp, VehicleId};

/// Default display icon for alerts that do not specify one.
pub const DEFAULT_ICON: &str = "circle-info";
/// Default foreground color (ARGB hex) for alerts.
pub const DEFAULT_COLOR: &str = "0xFF90A4AE";
/// Default background color (ARGB hex) for alerts.
pub const DEFAULT_BG_COLOR: &str = "0xFFECEFF1";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// What kind of condition an alert reports.
///
/// Serialized as an upper-case string. Unknown values are preserved as
/// [`AlertCategory::Custom`] so callers can define their own categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertCategory {
    RashDriving,
    Maintenance,
    Geofence,
    Theft,
    Custom(String),
}

impl AlertCategory {
    pub fn as_str(&self) -> &str {
        match self {
            AlertCategory::RashDriving => "RASH_DRIVING",
            AlertCategory::Maintenance => "MAINTENANCE",
            AlertCategory::Geofence => "GEOFENCE",
            AlertCategory::Theft => "THEFT",
            AlertCategory::Custom(name) => name,
        }
    }

    /// Prefix used for ids generated for this category.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            AlertCategory::RashDriving => "RD",
            AlertCategory::Maintenance => "MNT",
            AlertCategory::Geofence => "GEO",
            AlertCategory::Theft => "THF",
            AlertCategory::Custom(_) => "ALT",
        }
    }
}

impl From<String> for AlertCategory {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "RASH_DRIVING" => AlertCategory::RashDriving,
            "MAINTENANCE" => AlertCategory::Maintenance,
            "GEOFENCE" => AlertCategory::Geofence,
            "THEFT" => AlertCategory::Theft,
            _ => AlertCategory::Custom(normalized),
        }
    }
}

impl From<AlertCategory> for String {
    fn from(category: AlertCategory) -> Self {
        match category {
            AlertCategory::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(CoreError::Validation(format!("unknown severity '{other}'"))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A notification about a vehicle condition.
///
/// Once created the only permitted mutation is [`Alert::mark_actioned`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub vehicle_id: VehicleId,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub severity: Severity,
    pub message: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_actioned: bool,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_bg_color")]
    pub bg_color: String,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_bg_color() -> String {
    DEFAULT_BG_COLOR.to_string()
}

impl Alert {
    /// Create an alert with a freshly generated id and default display hints.
    pub fn new(
        vehicle_id: impl Into<VehicleId>,
        category: AlertCategory,
        severity: Severity,
        message: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            alert_id: generate_alert_id(category.id_prefix()),
            vehicle_id: vehicle_id.into(),
            category,
            severity,
            message: message.into(),
            timestamp,
            location: None,
            is_actioned: false,
            icon: default_icon(),
            color: default_color(),
            bg_color: default_bg_color(),
        }
    }

    /// Replace the generated id with one carrying a different prefix.
    pub fn with_id_prefix(mut self, prefix: &str) -> Self {
        self.alert_id = generate_alert_id(prefix);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn mark_actioned(&mut self) {
        self.is_actioned = true;
    }
}

/// Generate a collision-resistant alert id such as `RD-0190f3...`.
///
/// Uses a UUIDv7 so ids stay unique under concurrent evaluation and sort
/// roughly by creation time.
pub fn generate_alert_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

// ---------------------------------------------------------------------------
// External submissions
// ---------------------------------------------------------------------------

/// An alert submitted directly by an external caller.
///
/// Missing ids are generated, missing timestamps default to "now" and
/// missing display hints fall back to the defaults.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAlert {
    #[validate(length(min = 1, max = 128))]
    pub alert_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub severity: Severity,
    #[validate(length(min = 1))]
    pub message: String,
    pub timestamp: Option<Timestamp>,
    pub location: Option<String>,
    #[serde(default)]
    pub is_actioned: bool,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub bg_color: Option<String>,
}

impl NewAlert {
    /// Validate the submission and turn it into an [`Alert`].
    pub fn into_alert(self, now: Timestamp) -> Result<Alert, CoreError> {
        self.validate().map_err(|e| CoreError::from_validation(&e))?;

        let alert_id = self
            .alert_id
            .unwrap_or_else(|| generate_alert_id(self.category.id_prefix()));

        Ok(Alert {
            alert_id,
            vehicle_id: self.vehicle_id,
            category: self.category,
            severity: self.severity,
            message: self.message,
            timestamp: self.timestamp.unwrap_or(now),
            location: self.location,
            is_actioned: self.is_actioned,
            icon: self.icon.unwrap_or_else(default_icon),
            color: self.color.unwrap_or_else(default_color),
            bg_color: self.bg_color.unwrap_or_else(default_bg_color),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    #[test]
    fn category_round_trips_known_and_custom_names() {
        assert_eq!(AlertCategory::from("rash_driving".to_string()), AlertCategory::RashDriving);
        assert_eq!(
            AlertCategory::from("Tow_Detected".to_string()),
            AlertCategory::Custom("TOW_DETECTED".into())
        );
        assert_eq!(String::from(AlertCategory::Maintenance), "MAINTENANCE");
    }

    #[test]
    fn alert_serializes_with_wire_names_and_defaults() {
        let alert = Alert::new(
            "v1",
            AlertCategory::Maintenance,
            Severity::Critical,
            "Engine overheating! Stop immediately.",
            Utc::now(),
        );
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["type"], "MAINTENANCE");
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["is_actioned"], false);
        assert_eq!(json["icon"], DEFAULT_ICON);
        assert_eq!(json["color"], DEFAULT_COLOR);
        assert_eq!(json["bg_color"], DEFAULT_BG_COLOR);
        assert!(json["location"].is_null());
        assert!(json["alert_id"].as_str().unwrap().starts_with("MNT-"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_alert_id("RD")).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn mark_actioned_sets_flag() {
        let mut alert = Alert::new("v1", AlertCategory::Theft, Severity::High, "m", Utc::now());
        alert.mark_actioned();
        assert!(alert.is_actioned);
    }

    #[test]
    fn new_alert_fills_defaults() {
        let now = Utc::now();
        let submitted: NewAlert = serde_json::from_value(serde_json::json!({
            "vehicle_id": "v9",
            "type": "GEOFENCE",
            "severity": "LOW",
            "message": "Left the depot"
        }))
        .unwrap();

        let alert = submitted.into_alert(now).unwrap();
        assert!(alert.alert_id.starts_with("GEO-"));
        assert_eq!(alert.timestamp, now);
        assert_eq!(alert.icon, DEFAULT_ICON);
        assert!(!alert.is_actioned);
    }

    #[test]
    fn new_alert_with_empty_message_is_rejected() {
        let submitted: NewAlert = serde_json::from_value(serde_json::json!({
            "vehicle_id": "v9",
            "type": "THEFT",
            "severity": "HIGH",
            "message": ""
        }))
        .unwrap();

        assert_matches!(submitted.into_alert(Utc::now()), Err(CoreError::Validation(msg)) if msg.contains("message"));
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
    }
}

//! Alert row model.

use fleetpulse_core::alert::{Alert, AlertCategory, Severity};
use fleetpulse_core::types::Timestamp;
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `alerts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub alert_id: String,
    pub vehicle_id: String,
    pub category: String,
    pub severity: String,
    pub message: String,
    pub raised_at: Timestamp,
    pub location: Option<String>,
    pub is_actioned: bool,
    pub icon: String,
    pub color: String,
    pub bg_color: String,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let severity: Severity = row
            .severity
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("alert {} has severity '{}'", row.alert_id, row.severity)))?;

        Ok(Alert {
            alert_id: row.alert_id,
            vehicle_id: row.vehicle_id,
            category: AlertCategory::from(row.category),
            severity,
            message: row.message,
            timestamp: row.raised_at,
            location: row.location,
            is_actioned: row.is_actioned,
            icon: row.icon,
            color: row.color,
            bg_color: row.bg_color,
        })
    }
}

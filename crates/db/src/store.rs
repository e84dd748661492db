use async_trait::async_trait;
use fleetpulse_core::alert::Alert;

use crate::error::StoreError;

/// Persistence collaborator for alerts.
///
/// Implementations must be safe to share across tasks; the pipeline holds
/// them behind `Arc<dyn AlertStore>`.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Durably store a new alert and return the stored copy.
    ///
    /// Fails with [`StoreError::Duplicate`] if the id is already taken.
    async fn save_alert(&self, alert: &Alert) -> Result<Alert, StoreError>;

    /// List a vehicle's alerts oldest-first, optionally filtered by the
    /// actioned flag.
    async fn list_for_vehicle(
        &self,
        vehicle_id: &str,
        actioned: Option<bool>,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Mark an alert as actioned. Returns `None` if the id is unknown.
    async fn action_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError>;

    /// Confirm the store is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

//! In-process alert store.

use std::collections::HashMap;

use async_trait::async_trait;
use fleetpulse_core::alert::Alert;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::AlertStore;

#[derive(Debug, Default)]
struct Inner {
    /// Alerts in insertion order.
    alerts: Vec<Alert>,
    /// `alert_id` -> index into `alerts`.
    by_id: HashMap<String, usize>,
}

/// Alert store kept entirely in memory.
///
/// Used by tests and when the service runs without `DATABASE_URL`. Contents
/// are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    inner: RwLock<Inner>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored alerts.
    pub fn len(&self) -> usize {
        self.inner.read().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn save_alert(&self, alert: &Alert) -> Result<Alert, StoreError> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&alert.alert_id) {
            return Err(StoreError::Duplicate(alert.alert_id.clone()));
        }
        let index = inner.alerts.len();
        inner.by_id.insert(alert.alert_id.clone(), index);
        inner.alerts.push(alert.clone());
        Ok(alert.clone())
    }

    async fn list_for_vehicle(
        &self,
        vehicle_id: &str,
        actioned: Option<bool>,
    ) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.vehicle_id == vehicle_id)
            .filter(|a| actioned.map_or(true, |flag| a.is_actioned == flag))
            .cloned()
            .collect())
    }

    async fn action_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        let mut inner = self.inner.write();
        let Some(&index) = inner.by_id.get(alert_id) else {
            return Ok(None);
        };
        let alert = &mut inner.alerts[index];
        alert.mark_actioned();
        Ok(Some(alert.clone()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

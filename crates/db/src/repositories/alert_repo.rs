//! Repository for the `alerts` table.

use async_trait::async_trait;
use fleetpulse_core::alert::Alert;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::alert::AlertRow;
use crate::store::AlertStore;
use crate::DbPool;

/// Column list for `alerts` queries.
const COLUMNS: &str = "alert_id, vehicle_id, category, severity, message, raised_at, \
                       location, is_actioned, icon, color, bg_color";

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Provides read/write operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Insert a new alert, returning the stored row.
    pub async fn insert(pool: &PgPool, alert: &Alert) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts \
                (alert_id, vehicle_id, category, severity, message, raised_at, \
                 location, is_actioned, icon, color, bg_color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(&alert.alert_id)
            .bind(&alert.vehicle_id)
            .bind(alert.category.as_str())
            .bind(alert.severity.as_str())
            .bind(&alert.message)
            .bind(alert.timestamp)
            .bind(&alert.location)
            .bind(alert.is_actioned)
            .bind(&alert.icon)
            .bind(&alert.color)
            .bind(&alert.bg_color)
            .fetch_one(pool)
            .await
    }

    /// List a vehicle's alerts oldest-first, optionally filtered by `is_actioned`.
    pub async fn list_for_vehicle(
        pool: &PgPool,
        vehicle_id: &str,
        actioned: Option<bool>,
    ) -> Result<Vec<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE vehicle_id = $1 AND ($2::BOOLEAN IS NULL OR is_actioned = $2) \
             ORDER BY raised_at, id"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(vehicle_id)
            .bind(actioned)
            .fetch_all(pool)
            .await
    }

    /// Set `is_actioned` on an alert. Returns `None` if no row matched.
    pub async fn mark_actioned(
        pool: &PgPool,
        alert_id: &str,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET is_actioned = TRUE WHERE alert_id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(alert_id)
            .fetch_optional(pool)
            .await
    }
}

/// [`AlertStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: DbPool,
}

impl PgAlertStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn save_alert(&self, alert: &Alert) -> Result<Alert, StoreError> {
        match AlertRepo::insert(&self.pool, alert).await {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(StoreError::Duplicate(alert.alert_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_vehicle(
        &self,
        vehicle_id: &str,
        actioned: Option<bool>,
    ) -> Result<Vec<Alert>, StoreError> {
        AlertRepo::list_for_vehicle(&self.pool, vehicle_id, actioned)
            .await?
            .into_iter()
            .map(Alert::try_from)
            .collect()
    }

    async fn action_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        AlertRepo::mark_actioned(&self.pool, alert_id)
            .await?
            .map(Alert::try_from)
            .transpose()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

//! Handlers for stored alerts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use fleetpulse_core::alert::{Alert, NewAlert};
use fleetpulse_core::error::CoreError;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for listing a vehicle's alerts.
#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    /// Only return alerts with this actioned flag.
    pub actioned: Option<bool>,
}

/// POST /alerts
///
/// Store an externally raised alert and push it to the vehicle's subscribers.
pub async fn create_alert(
    State(state): State<AppState>,
    Json(input): Json<NewAlert>,
) -> AppResult<(StatusCode, Json<DataResponse<Alert>>)> {
    let alert = input.into_alert(Utc::now())?;
    let saved = state.pipeline.submit_alert(alert).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: saved })))
}

/// GET /vehicles/{vehicle_id}/alerts
pub async fn list_vehicle_alerts(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(params): Query<AlertListQuery>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = state
        .store
        .list_for_vehicle(&vehicle_id, params.actioned)
        .await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// POST /alerts/{alert_id}/action
///
/// Mark an alert as handled. Actioning twice is harmless.
pub async fn action_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state
        .store
        .action_alert(&alert_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Alert",
            id: alert_id.clone(),
        })?;

    tracing::info!(alert_id = %alert.alert_id, vehicle_id = %alert.vehicle_id, "Alert actioned");
    Ok(Json(DataResponse { data: alert }))
}

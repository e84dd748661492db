pub mod alerts;
pub mod health;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ingest/telemetry                    ingest one sample (POST)
/// /ws/telemetry/{vehicle_id}           per-vehicle WebSocket stream
///
/// /alerts                              submit alert (POST)
/// /alerts/{alert_id}/action            mark actioned (POST)
/// /vehicles/{vehicle_id}/alerts        list stored alerts (GET, ?actioned=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(telemetry::router())
        .merge(alerts::router())
}

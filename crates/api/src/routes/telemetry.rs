use axum::routing::{get, post};
use axum::Router;

use crate::handlers::telemetry;
use crate::state::AppState;
use crate::ws;

/// Telemetry routes.
///
/// ```text
/// POST /ingest/telemetry             -> ingest_telemetry
/// GET  /ws/telemetry/{vehicle_id}    -> telemetry_ws_handler (upgrade)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingest/telemetry", post(telemetry::ingest_telemetry))
        .route("/ws/telemetry/{vehicle_id}", get(ws::telemetry_ws_handler))
}

//! Handler for telemetry ingestion.

use axum::extract::State;
use axum::Json;
use fleetpulse_core::alert::Alert;
use fleetpulse_core::telemetry::TelemetryPayload;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Response body for a successfully ingested sample.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub alerts_generated: usize,
    pub persistence_failures: usize,
    pub alerts: Vec<Alert>,
}

/// POST /ingest/telemetry
///
/// Run one sample through the rule engine, store the resulting alerts and
/// push the sample (and any alerts) to the vehicle's subscribers.
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    Json(payload): Json<TelemetryPayload>,
) -> AppResult<Json<IngestResponse>> {
    let result = state.pipeline.ingest(payload).await?;

    Ok(Json(IngestResponse {
        status: "success",
        alerts_generated: result.alerts_generated,
        persistence_failures: result.persistence_failures,
        alerts: result.alerts,
    }))
}

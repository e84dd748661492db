use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Alert routes.
///
/// ```text
/// POST /alerts                          -> create_alert
/// POST /alerts/{alert_id}/action        -> action_alert
/// GET  /vehicles/{vehicle_id}/alerts    -> list_vehicle_alerts (?actioned=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", post(alerts::create_alert))
        .route("/alerts/{alert_id}/action", post(alerts::action_alert))
        .route(
            "/vehicles/{vehicle_id}/alerts",
            get(alerts::list_vehicle_alerts),
        )
}

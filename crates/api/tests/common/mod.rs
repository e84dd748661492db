#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use fleetpulse_core::rules::{RuleEngine, RuleThresholds};
use fleetpulse_db::{AlertStore, MemoryAlertStore};
use fleetpulse_events::SubscriptionRegistry;
use fleetpulse_pipeline::IngestionPipeline;
use http_body_util::BodyExt;
use tower::ServiceExt;

use fleetpulse_api::config::ServerConfig;
use fleetpulse_api::router::build_app_router;
use fleetpulse_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        subscriber_buffer: 64,
        heartbeat_interval_secs: 30,
        rules: RuleThresholds::default(),
        log_json: false,
    }
}

/// Build application state around the given alert store.
pub fn test_state(store: Arc<dyn AlertStore>) -> AppState {
    let config = test_config();
    let registry = SubscriptionRegistry::new(config.subscriber_buffer);
    let pipeline = IngestionPipeline::new(Arc::new(RuleEngine::default()), store, registry);
    AppState::new(config, pipeline)
}

/// Build the full application router with all middleware layers and an
/// in-memory alert store.
///
/// Returns the state too so tests can subscribe to the registry or inspect
/// the store directly.
pub fn build_test_app() -> (Router, AppState) {
    let state = test_state(Arc::new(MemoryAlertStore::new()));
    let app = build_app_router(state.clone(), &state.config);
    (app, state)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request with a JSON body through the router.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request without a body.
pub async fn post_empty(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

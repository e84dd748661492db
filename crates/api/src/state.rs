use std::sync::Arc;

use fleetpulse_db::AlertStore;
use fleetpulse_events::SubscriptionRegistry;
use fleetpulse_pipeline::IngestionPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Telemetry ingestion pipeline (rules, persistence, fan-out).
    pub pipeline: Arc<IngestionPipeline>,
    /// Per-vehicle subscription registry shared with the pipeline.
    pub registry: SubscriptionRegistry,
    /// Alert store shared with the pipeline.
    pub store: Arc<dyn AlertStore>,
}

impl AppState {
    /// Assemble state from a pipeline, sharing its registry and store.
    pub fn new(config: ServerConfig, pipeline: IngestionPipeline) -> Self {
        let registry = pipeline.registry().clone();
        let store = Arc::clone(pipeline.store());
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            registry,
            store,
        }
    }
}

//! The ingestion pipeline: validate -> evaluate -> persist -> publish.

use std::sync::Arc;

use chrono::Utc;
use fleetpulse_core::alert::Alert;
use fleetpulse_core::error::CoreError;
use fleetpulse_core::rules::RuleEngine;
use fleetpulse_core::telemetry::{TelemetryPayload, TelemetrySample};
use fleetpulse_core::types::Timestamp;
use fleetpulse_db::{AlertStore, StoreError};
use fleetpulse_events::{StreamMessage, SubscriptionRegistry};
use futures::future::join_all;
use serde::Serialize;

/// Summary of one ingested sample.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    /// Number of alerts the rule engine produced.
    pub alerts_generated: usize,
    /// How many of those alerts could not be stored.
    pub persistence_failures: usize,
    /// The generated alerts, in rule order.
    pub alerts: Vec<Alert>,
}

/// Processes telemetry samples end to end.
///
/// Holds no locks of its own: rule evaluation is pure, persistence goes
/// through the store, and fan-out locks only the sample's vehicle inside the
/// registry.
pub struct IngestionPipeline {
    engine: Arc<RuleEngine>,
    store: Arc<dyn AlertStore>,
    registry: SubscriptionRegistry,
}

impl IngestionPipeline {
    pub fn new(
        engine: Arc<RuleEngine>,
        store: Arc<dyn AlertStore>,
        registry: SubscriptionRegistry,
    ) -> Self {
        Self {
            engine,
            store,
            registry,
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    /// Ingest a raw payload, stamping generated alerts with the current time.
    pub async fn ingest(&self, payload: TelemetryPayload) -> Result<IngestResult, CoreError> {
        self.ingest_at(payload, Utc::now()).await
    }

    /// Ingest a raw payload with an explicit evaluation time.
    ///
    /// Fails only when the payload is missing mandatory fields; in that case
    /// nothing is evaluated, stored or published.
    pub async fn ingest_at(
        &self,
        payload: TelemetryPayload,
        now: Timestamp,
    ) -> Result<IngestResult, CoreError> {
        let sample = TelemetrySample::try_from(payload)?;
        Ok(self.process(sample, now).await)
    }

    /// Run an already validated sample through the pipeline.
    ///
    /// Alerts that fail to persist are still published: subscribers get
    /// every alert, durability is best effort.
    pub async fn process(&self, sample: TelemetrySample, now: Timestamp) -> IngestResult {
        let alerts = self.engine.evaluate(&sample, now);
        let persistence_failures = self.persist(&alerts).await;
        let vehicle_id = sample.vehicle_id.clone();

        let telemetry = self
            .registry
            .publish(&vehicle_id, StreamMessage::Telemetry(sample));
        if !alerts.is_empty() {
            self.registry
                .publish(&vehicle_id, StreamMessage::Alert(alerts.clone()));
        }

        tracing::debug!(
            vehicle_id = %vehicle_id,
            alerts = alerts.len(),
            persistence_failures,
            subscribers = telemetry.delivered,
            "Telemetry ingested"
        );

        IngestResult {
            alerts_generated: alerts.len(),
            persistence_failures,
            alerts,
        }
    }

    /// Store an externally submitted alert and push it to the vehicle's
    /// subscribers as a one-element batch.
    ///
    /// Unlike rule-generated alerts, a storage failure here is returned to
    /// the caller and nothing is published.
    pub async fn submit_alert(&self, alert: Alert) -> Result<Alert, StoreError> {
        let saved = self.store.save_alert(&alert).await?;
        self.registry
            .publish(&saved.vehicle_id, StreamMessage::Alert(vec![saved.clone()]));
        tracing::info!(alert_id = %saved.alert_id, vehicle_id = %saved.vehicle_id, "Alert submitted");
        Ok(saved)
    }

    /// Save every alert concurrently and return how many failed.
    async fn persist(&self, alerts: &[Alert]) -> usize {
        let results = join_all(alerts.iter().map(|alert| self.store.save_alert(alert))).await;

        results
            .iter()
            .zip(alerts)
            .filter(|(result, alert)| match result {
                Ok(_) => false,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        alert_id = %alert.alert_id,
                        vehicle_id = %alert.vehicle_id,
                        "Failed to persist alert"
                    );
                    true
                }
            })
            .count()
    }
}

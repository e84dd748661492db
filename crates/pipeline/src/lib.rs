//! Telemetry ingestion pipeline.
//!
//! Wires the pure [`RuleEngine`](fleetpulse_core::rules::RuleEngine), the
//! [`AlertStore`](fleetpulse_db::AlertStore) collaborator and the
//! [`SubscriptionRegistry`](fleetpulse_events::SubscriptionRegistry) into a
//! single [`IngestionPipeline::ingest`] entrypoint.

pub mod ingest;

pub use ingest::{IngestResult, IngestionPipeline};

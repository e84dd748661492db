pub mod alerts;
pub mod telemetry;

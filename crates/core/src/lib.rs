//! Domain types and pure logic for the fleetpulse telemetry service.
//!
//! Nothing in this crate performs I/O: telemetry validation, the alert
//! model and the rule engine can all be exercised in isolation.

pub mod alert;
pub mod error;
pub mod rules;
pub mod telemetry;
pub mod types;

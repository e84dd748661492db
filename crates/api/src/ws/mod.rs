//! WebSocket infrastructure for real-time telemetry streaming.
//!
//! Provides the per-connection subscriber session, heartbeat bookkeeping,
//! and the HTTP upgrade handler used by Axum routes.

mod handler;
pub mod heartbeat;
pub mod session;

pub use handler::telemetry_ws_handler;
pub use heartbeat::Heartbeat;
pub use session::{SessionError, SessionState, SubscriberSession};

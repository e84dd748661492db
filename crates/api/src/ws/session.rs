//! One subscriber connection bound to a single vehicle.

use fleetpulse_core::types::VehicleId;
use fleetpulse_events::{Delivery, RegistryError, Subscription, SubscriptionRegistry};

/// Lifecycle of a [`SubscriberSession`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A real-time channel scoped to one vehicle id.
///
/// The session owns its [`Subscription`], so leaving `Open` by any path
/// (explicit close, error, drop) releases the registry entry.
#[derive(Debug)]
pub struct SubscriberSession {
    conn_id: String,
    vehicle_id: VehicleId,
    state: SessionState,
    subscription: Option<Subscription>,
}

impl SubscriberSession {
    pub fn new(vehicle_id: impl Into<VehicleId>) -> Self {
        Self {
            conn_id: uuid::Uuid::new_v4().to_string(),
            vehicle_id: vehicle_id.into(),
            state: SessionState::Connecting,
            subscription: None,
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Register with `registry` and move to `Open`.
    ///
    /// Only valid from `Connecting`. If the registry refuses (shutdown) the
    /// session goes straight to `Closed`.
    pub fn open(&mut self, registry: &SubscriptionRegistry) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Open,
            });
        }

        match registry.subscribe(self.vehicle_id.clone()) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = SessionState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e.into())
            }
        }
    }

    /// Wait for the next message published to this session's vehicle.
    ///
    /// Returns `None` when the session is not open or the registry has
    /// dropped the subscription (lagged subscriber or shutdown).
    pub async fn next_message(&mut self) -> Option<Delivery> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => None,
        }
    }

    /// Unregister and move to `Closed`. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.subscription = None;
        self.state = SessionState::Closed;
        tracing::debug!(conn_id = %self.conn_id, vehicle_id = %self.vehicle_id, "Session closed");
    }
}

impl Drop for SubscriberSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Per-vehicle subscription registry.
//!
//! [`SubscriptionRegistry`] maps each vehicle id to its own independently
//! locked set of subscribers. Publishing for a vehicle only ever touches that
//! vehicle's set, so traffic for unrelated vehicles never serializes on a
//! shared lock and a message can never leak to another vehicle's
//! subscribers.
//!
//! Lock order is always the outer map first, then a vehicle slot. The outer
//! map lock is only held long enough to look up or create a slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use fleetpulse_core::types::VehicleId;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use uuid::Uuid;

use crate::message::StreamMessage;

/// Default per-subscriber buffer, in messages.
pub const DEFAULT_BUFFER: usize = 256;

/// A message as seen by a subscriber. Shared between all recipients.
pub type Delivery = Arc<StreamMessage>;

// ---------------------------------------------------------------------------
// Errors and reports
// ---------------------------------------------------------------------------

/// Why a message could not be handed to a subscriber.
///
/// Never surfaced to publishers: the subscriber is removed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscriber channel is closed")]
    Closed,
    #[error("subscriber buffer is full")]
    Lagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("subscription registry is closed")]
    Closed,
}

/// Outcome of a single [`SubscriptionRegistry::publish`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the message was queued for.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Opaque identity of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A live subscription to one vehicle's messages.
///
/// Dropping the handle unregisters it, so a subscription never outlives its
/// owner. [`recv`](Subscription::recv) returns `None` once the subscription
/// has been removed by the registry (delivery failure or shutdown) and its
/// buffer is drained.
pub struct Subscription {
    id: SubscriptionId,
    vehicle_id: VehicleId,
    receiver: mpsc::Receiver<Delivery>,
    registry: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Take the next message if one is already queued.
    pub fn try_recv(&mut self) -> Result<Delivery, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("vehicle_id", &self.vehicle_id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.registry.upgrade() {
            shared.remove(&self.vehicle_id, self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Registry internals
// ---------------------------------------------------------------------------

/// The subscriber set of a single vehicle.
#[derive(Default)]
struct Slot {
    subscribers: HashMap<SubscriptionId, mpsc::Sender<Delivery>>,
    /// Set once the slot has been unlinked from the map; a retired slot
    /// must not accept new subscribers.
    retired: bool,
}

type SlotRef = Arc<Mutex<Slot>>;

struct Shared {
    vehicles: RwLock<HashMap<VehicleId, SlotRef>>,
    closed: AtomicBool,
    buffer: usize,
}

impl Shared {
    fn slot(&self, vehicle_id: &str) -> Option<SlotRef> {
        self.vehicles.read().get(vehicle_id).cloned()
    }

    fn slot_or_insert(&self, vehicle_id: &str) -> Result<SlotRef, RegistryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::Closed);
        }
        if let Some(slot) = self.slot(vehicle_id) {
            return Ok(slot);
        }

        let mut vehicles = self.vehicles.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::Closed);
        }
        let slot = vehicles
            .entry(vehicle_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::default())));
        Ok(Arc::clone(slot))
    }

    fn remove(&self, vehicle_id: &str, id: SubscriptionId) -> bool {
        let Some(slot) = self.slot(vehicle_id) else {
            return false;
        };

        let (removed, now_empty) = {
            let mut guard = slot.lock();
            let removed = guard.subscribers.remove(&id).is_some();
            (removed, guard.subscribers.is_empty())
        };

        if removed {
            tracing::debug!(vehicle_id, subscription_id = %id, "Subscription removed");
        }
        if now_empty {
            self.retire_if_empty(vehicle_id, &slot);
        }
        removed
    }

    /// Unlink `slot` from the map if it is still the current slot for the
    /// vehicle and has no subscribers left.
    fn retire_if_empty(&self, vehicle_id: &str, slot: &SlotRef) {
        let mut vehicles = self.vehicles.write();
        match vehicles.get(vehicle_id) {
            Some(current) if Arc::ptr_eq(current, slot) => {}
            _ => return,
        }

        let mut guard = slot.lock();
        if guard.subscribers.is_empty() {
            guard.retired = true;
            drop(guard);
            vehicles.remove(vehicle_id);
        }
    }
}

// ---------------------------------------------------------------------------
// SubscriptionRegistry
// ---------------------------------------------------------------------------

/// Keyed fan-out hub: vehicle id -> live subscriptions.
///
/// Cheap to clone; clones share the same registry.
///
/// # Usage
///
/// ```rust
/// use fleetpulse_events::{StreamMessage, SubscriptionRegistry};
///
/// let registry = SubscriptionRegistry::default();
/// let sub = registry.subscribe("KA-01").unwrap();
///
/// let report = registry.publish("KA-02", StreamMessage::Alert(vec![]));
/// assert_eq!(report.delivered, 0);
/// assert_eq!(registry.subscriber_count(sub.vehicle_id()), 1);
/// ```
#[derive(Clone)]
pub struct SubscriptionRegistry {
    shared: Arc<Shared>,
}

impl SubscriptionRegistry {
    /// Create a registry whose subscribers buffer up to `buffer` messages.
    ///
    /// A subscriber whose buffer is full when a message is published is
    /// considered too slow and is removed.
    pub fn new(buffer: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                vehicles: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a new subscription for `vehicle_id`.
    ///
    /// Only fails after [`close`](Self::close).
    pub fn subscribe(
        &self,
        vehicle_id: impl Into<VehicleId>,
    ) -> Result<Subscription, RegistryError> {
        let vehicle_id = vehicle_id.into();
        let id = SubscriptionId::generate();
        let (sender, receiver) = mpsc::channel(self.shared.buffer);

        loop {
            let slot = self.shared.slot_or_insert(&vehicle_id)?;
            let mut guard = slot.lock();
            if guard.retired {
                // Lost a race with the last subscriber leaving; fetch the
                // replacement slot.
                continue;
            }
            guard.subscribers.insert(id, sender);
            break;
        }

        tracing::debug!(vehicle_id = %vehicle_id, subscription_id = %id, "Subscription added");

        Ok(Subscription {
            id,
            vehicle_id,
            receiver,
            registry: Arc::downgrade(&self.shared),
        })
    }

    /// Remove a subscription. Repeated or unknown removals are no-ops.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.shared.remove(&subscription.vehicle_id, subscription.id);
    }

    /// Remove a subscription by vehicle and id. Returns whether it was present.
    pub fn unsubscribe_id(&self, vehicle_id: &str, id: SubscriptionId) -> bool {
        self.shared.remove(vehicle_id, id)
    }

    /// Deliver `message` to every subscriber currently registered for
    /// `vehicle_id`.
    ///
    /// Subscribers whose channel is closed or full are removed; delivery to
    /// the remaining subscribers continues. Messages published for the same
    /// vehicle reach each subscriber in publish order.
    pub fn publish(&self, vehicle_id: &str, message: StreamMessage) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(slot) = self.shared.slot(vehicle_id) else {
            return report;
        };
        let message: Delivery = Arc::new(message);

        let now_empty = {
            let mut guard = slot.lock();
            guard
                .subscribers
                .retain(|id, sender| match deliver(sender, &message) {
                    Ok(()) => {
                        report.delivered += 1;
                        true
                    }
                    Err(DeliveryError::Closed) => {
                        tracing::debug!(vehicle_id, subscription_id = %id, "Dropping closed subscriber");
                        report.dropped += 1;
                        false
                    }
                    Err(DeliveryError::Lagged) => {
                        tracing::warn!(vehicle_id, subscription_id = %id, "Dropping lagging subscriber");
                        report.dropped += 1;
                        false
                    }
                });
            report.dropped > 0 && guard.subscribers.is_empty()
        };

        if now_empty {
            self.shared.retire_if_empty(vehicle_id, &slot);
        }

        tracing::trace!(
            vehicle_id,
            kind = message.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Published"
        );
        report
    }

    /// Number of live subscriptions for `vehicle_id`.
    pub fn subscriber_count(&self, vehicle_id: &str) -> usize {
        self.shared
            .slot(vehicle_id)
            .map_or(0, |slot| slot.lock().subscribers.len())
    }

    /// Number of live subscriptions across all vehicles.
    pub fn total_subscribers(&self) -> usize {
        let slots: Vec<SlotRef> = self.shared.vehicles.read().values().cloned().collect();
        slots.iter().map(|slot| slot.lock().subscribers.len()).sum()
    }

    /// Number of vehicles with at least one subscription.
    pub fn vehicle_count(&self) -> usize {
        self.shared.vehicles.read().len()
    }

    /// Remove every subscription and reject new ones.
    ///
    /// Existing subscribers drain what is already buffered and then observe
    /// the end of their stream. Used during graceful shutdown.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);

        let mut vehicles = self.shared.vehicles.write();
        let mut count = 0;
        for slot in vehicles.values() {
            let mut guard = slot.lock();
            count += guard.subscribers.len();
            guard.subscribers.clear();
            guard.retired = true;
        }
        vehicles.clear();
        tracing::info!(count, "Closed all subscriptions");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("vehicles", &self.vehicle_count())
            .field("buffer", &self.shared.buffer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn deliver(sender: &mpsc::Sender<Delivery>, message: &Delivery) -> Result<(), DeliveryError> {
    sender.try_send(Arc::clone(message)).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::Lagged,
        TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn alert_batch() -> StreamMessage {
        StreamMessage::Alert(Vec::new())
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let registry = SubscriptionRegistry::default();
        let mut sub = registry.subscribe("v1").unwrap();

        let report = registry.publish("v1", alert_batch());

        assert_eq!(report, PublishReport { delivered: 1, dropped: 0 });
        let msg = sub.recv().await.expect("should receive the message");
        assert_eq!(msg.kind(), "alert");
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let registry = SubscriptionRegistry::default();
        assert_eq!(registry.publish("nobody", alert_batch()), PublishReport::default());
    }

    #[test]
    fn publish_is_scoped_to_vehicle() {
        let registry = SubscriptionRegistry::default();
        let mut v1 = registry.subscribe("v1").unwrap();
        let mut v2 = registry.subscribe("v2").unwrap();

        registry.publish("v1", alert_batch());

        assert!(v1.try_recv().is_ok());
        assert_matches!(v2.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::default();
        let keep = registry.subscribe("v1").unwrap();
        let sub = registry.subscribe("v1").unwrap();

        registry.unsubscribe(&sub);
        let after_once = (registry.subscriber_count("v1"), registry.vehicle_count());
        registry.unsubscribe(&sub);
        let after_twice = (registry.subscriber_count("v1"), registry.vehicle_count());

        assert_eq!(after_once, (1, 1));
        assert_eq!(after_once, after_twice);
        assert!(!registry.unsubscribe_id("v1", sub.id()));
        assert!(!registry.unsubscribe_id("unknown", keep.id()));
    }

    #[test]
    fn unsubscribed_handle_receives_nothing() {
        let registry = SubscriptionRegistry::default();
        let mut sub = registry.subscribe("v1").unwrap();

        registry.unsubscribe(&sub);
        let report = registry.publish("v1", alert_batch());

        assert_eq!(report.delivered, 0);
        // Sender side is gone, so the stream has ended.
        assert_matches!(sub.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn dropping_subscription_unregisters_it() {
        let registry = SubscriptionRegistry::default();
        let sub = registry.subscribe("v1").unwrap();
        assert_eq!(registry.total_subscribers(), 1);

        drop(sub);

        assert_eq!(registry.total_subscribers(), 0);
        assert_eq!(registry.vehicle_count(), 0);
    }

    #[test]
    fn full_buffer_removes_only_the_slow_subscriber() {
        let registry = SubscriptionRegistry::new(2);
        let _slow = registry.subscribe("v1").unwrap();
        let mut fast = registry.subscribe("v1").unwrap();

        registry.publish("v1", alert_batch());
        assert!(fast.try_recv().is_ok());
        registry.publish("v1", alert_batch());
        assert!(fast.try_recv().is_ok());

        // `slow` has two queued messages now; the third overflows it.
        let report = registry.publish("v1", alert_batch());

        assert_eq!(report, PublishReport { delivered: 1, dropped: 1 });
        assert_eq!(registry.subscriber_count("v1"), 1);
        assert!(fast.try_recv().is_ok());
    }

    #[test]
    fn closed_receiver_is_removed_on_publish() {
        let registry = SubscriptionRegistry::default();
        let mut sub = registry.subscribe("v1").unwrap();
        sub.receiver.close();

        let report = registry.publish("v1", alert_batch());

        assert_eq!(report, PublishReport { delivered: 0, dropped: 1 });
        assert_eq!(registry.subscriber_count("v1"), 0);
        assert_eq!(registry.vehicle_count(), 0);
    }

    #[tokio::test]
    async fn close_ends_streams_and_rejects_new_subscribers() {
        let registry = SubscriptionRegistry::default();
        let mut sub = registry.subscribe("v1").unwrap();
        registry.publish("v1", alert_batch());

        registry.close();

        assert!(sub.recv().await.is_some(), "buffered message is still delivered");
        assert!(sub.recv().await.is_none());
        assert_matches!(registry.subscribe("v1"), Err(RegistryError::Closed));
        assert_eq!(registry.total_subscribers(), 0);
    }

    #[test]
    fn slot_is_recreated_after_last_subscriber_leaves() {
        let registry = SubscriptionRegistry::default();
        drop(registry.subscribe("v1").unwrap());
        assert_eq!(registry.vehicle_count(), 0);

        let mut sub = registry.subscribe("v1").unwrap();
        registry.publish("v1", alert_batch());

        assert!(sub.try_recv().is_ok());
    }
}

//! Real-time fan-out for fleetpulse.
//!
//! This crate provides the building blocks for pushing vehicle data to live
//! subscribers:
//!
//! - [`SubscriptionRegistry`]: keyed publish/subscribe hub. Every
//!   subscription is scoped to exactly one vehicle id and only receives
//!   messages published for that vehicle.
//! - [`Subscription`]: owned handle for one subscriber; dropping it
//!   unregisters it.
//! - [`StreamMessage`]: the `{"type": ..., "data": ...}` envelope pushed to
//!   subscribers.

pub mod message;
pub mod registry;

pub use message::StreamMessage;
pub use registry::{
    Delivery, DeliveryError, PublishReport, RegistryError, Subscription, SubscriptionId,
    SubscriptionRegistry, DEFAULT_BUFFER,
};

//! Bibliobox event bus and device-notification infrastructure.
//!
//! This crate provides the building blocks for the platform-wide event
//! system:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] — the canonical domain event envelope, with the
//!   lending event vocabulary in [`bus::topics`].
//! - [`EventPersistence`] — background service that durably writes every
//!   event to the `events` table.
//! - [`LockerBridge`] — best-effort delivery of locker access commands to
//!   the hardware bridge (the ESP32 fleet's HTTP ingress). Failures are
//!   logged and never affect the owning transaction.

pub mod bus;
pub mod delivery;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::locker_bridge::{BridgeConfig, LockerBridge, LockerCommand};
pub use persistence::EventPersistence;

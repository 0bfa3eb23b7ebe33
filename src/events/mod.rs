//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskRunner` (tick lifecycle), `DependencyGate` (availability),
//!   `Engine` (shutdown), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the engine listener, which fans out to the `SubscriberSet`.
//!   The `StatusRegistry` is fed synchronously by the runner, not through the bus.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

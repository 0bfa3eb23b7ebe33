//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! TaskRunner / DependencyGate / Engine ── publish(Event) ──► Bus
//!                                                              │
//!                                                     engine listener
//!                                                              │
//!                                                   SubscriberSet::emit(&Event)
//!                                                    ┌─────────┼─────────┐
//!                                                    ▼         ▼         ▼
//!                                                LogWriter  Metrics   Custom ...
//! ```
//!
//! The [`StatusRegistry`](crate::StatusRegistry) is not a subscriber: it is updated
//! synchronously before the bus sees an event, so reports never lag behind.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

//! # tickvisor
//!
//! **Tickvisor** is a small recurring-task engine for tokio applications.
//!
//! Every registered task runs on a fixed interval, at most once at a time, only while
//! its conditions hold and its external dependencies are reachable, and never for
//! longer than `termination_factor × interval`. Every step is published as a
//! lifecycle event and folded into a per-task health record.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//!     │ TaskDefinition │   │ TaskDefinition │   │ TaskDefinition │
//!     │  Billing.sync  │   │  Mailer.flush  │   │  Ledger.close  │
//!     └───────┬────────┘   └───────┬────────┘   └───────┬────────┘
//!             ▼                    ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine                                                           │
//! │  - ExecutionGuard (one permit per key)                            │
//! │  - DependencyGate (unavailable dependency set)                    │
//! │  - StatusRegistry (records + derived health)                      │
//! │  - Schedule (IntervalScheduler by default)                        │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TaskRunner  │   │  TaskRunner  │   │  TaskRunner  │
//!     │ (one / tick) │   │ (one / tick) │   │ (one / tick) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │  StatusRegistry::apply, then publish│
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          engine listener
//!                                   ▼
//!                            SubscriberSet
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter   metrics     custom
//! ```
//!
//! ### Tick lifecycle
//! ```text
//! interval elapses ─► TaskRunner::run()
//!   ├─► Init                                   (first tick only)
//!   ├─► disabled?               ─► Stopped
//!   ├─► required dependency down ─► MicroservicesUnresponsive{names}
//!   ├─► conditions (concurrent, timed)
//!   │       └─ any failed        ─► ConditionsNotMet{names}
//!   ├─► guard held?             ─► AlreadyRunning
//!   └─► Started
//!         watchdog(body, termination_factor × interval)
//!           ├─ Ok    ─► [LongRunning] ─► Success
//!           ├─ Err   ─► on_error      ─► Error
//!           └─ limit ─► on_terminate  ─► Terminated   (body cancelled, detached)
//!         finally ─► Finish ─► guard released
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Engine**        | Register tasks, feed dependency state, report, shut down.    | [`Engine`], [`Registration`]               |
//! | **Tasks**         | Bodies, conditions, hooks and identity of recurring tasks.   | [`TaskDefinition`], [`TaskFn`], [`TaskKey`]|
//! | **Gating**        | Conditions and dependency availability decide each tick.     | [`ConditionEvaluator`], [`DependencyGate`] |
//! | **Safety**        | Single-flight per key, overrun termination.                  | [`ExecutionGuard`], [`Watchdog`]           |
//! | **Status**        | Per-task records and derived health.                         | [`StatusRegistry`], [`StatusKind`]         |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, alerts).       | [`Subscribe`], [`SubscriberSet`]           |
//! | **Errors**        | Typed errors for the engine and for task runs.               | [`RuntimeError`], [`TaskError`]            |
//! | **Configuration** | Timeouts, factors and windows in one place.                  | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Config, Engine, StatusKind, TaskDefinition, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::builder(Config::default()).build();
//!     engine.init();
//!
//!     let reconcile = TaskDefinition::builder("Ledger.reconcile", Duration::from_millis(200))
//!         .requires("PaymentService")
//!         .condition("hasWork", || async { Ok(true) })
//!         .on_error(|err| async move { eprintln!("reconcile failed: {err}") })
//!         .build(|ctx| async move {
//!             if ctx.is_cancelled() {
//!                 return Ok(());
//!             }
//!             Ok::<(), TaskError>(())
//!         });
//!     engine.register_task(reconcile)?;
//!
//!     let outcome = engine.trigger("Ledger.reconcile").await;
//!     assert!(outcome.is_some_and(|o| o.ran()));
//!     assert_eq!(
//!         engine.status("Ledger.reconcile").map(|s| s.status),
//!         Some(StatusKind::Healthy)
//!     );
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    CONDITION_TIMEOUT, ConditionEvaluator, Config, DEPENDENCIES_AVAILABLE, DependencyGate,
    Engine, EngineBuilder, ExecutionGuard, GuardPermit, INTERVAL_TERMINATION_FACTOR,
    IntervalScheduler, NOT_MET_LOG_THROTTLE, Registration, STARTUP_QUIET, Schedule, StatusKind,
    StatusRegistry, TaskRecord, TaskRunner, TaskStatus, TickFn, TickOutcome, WatchOutcome,
    Watchdog,
};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    BoxTaskFuture, Condition, ConditionFn, ConditionRef, ErrorHook, FinallyHook, Task,
    TaskDefinition, TaskDefinitionBuilder, TaskFn, TaskKey, TaskRef,
};

// Built-in tracing subscriber.
// Enabled by default; opt out with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

//! Runtime core: gating, mutual exclusion, overrun detection, scheduling, status.
//!
//! The entry point is [`Engine`]; the other types are public so custom schedulers and
//! tests can drive the pieces directly.
//!
//! Modules:
//! - [`guard`]: single-flight permit per task key;
//! - [`conditions`]: concurrent, timed evaluation of named predicates;
//! - [`dependencies`]: live availability of named external dependencies;
//! - [`watchdog`]: runs a body and abandons it after `factor × interval`;
//! - [`runner`]: one tick of a task, publishing lifecycle events;
//! - [`scheduler`]: fixed-interval tick loops;
//! - [`status`]: per-task records and derived health;
//! - [`engine`]: registration, dependency signals, shutdown;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod conditions;
mod config;
mod dependencies;
mod engine;
mod guard;
mod runner;
mod scheduler;
mod shutdown;
mod status;
mod watchdog;

pub use builder::EngineBuilder;
pub use conditions::ConditionEvaluator;
pub use config::{
    CONDITION_TIMEOUT, Config, INTERVAL_TERMINATION_FACTOR, NOT_MET_LOG_THROTTLE, STARTUP_QUIET,
};
pub use dependencies::{DEPENDENCIES_AVAILABLE, DependencyGate};
pub use engine::{Engine, Registration};
pub use guard::{ExecutionGuard, GuardPermit};
pub use runner::{TaskRunner, TickOutcome};
pub use scheduler::{IntervalScheduler, Schedule, TickFn};
pub use status::{StatusKind, StatusRegistry, TaskRecord, TaskStatus};
pub use watchdog::{WatchOutcome, Watchdog};

//! Error types used by the tickvisor engine and by task bodies.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the engine itself (registration, shutdown).
//! - [`TaskError`]: errors raised by an individual run of a task body.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the engine.
///
/// Registration errors are programming-contract violations and are returned
/// at registration time, never at run time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The same task key was registered twice with different intervals.
    #[error("task '{key}' already registered with interval {registered:?}, got {requested:?}")]
    IntervalMismatch {
        /// Task key.
        key: String,
        /// Interval of the existing registration.
        registered: Duration,
        /// Interval of the rejected registration.
        requested: Duration,
    },

    /// A task was defined with a zero interval.
    #[error("task '{key}' must have a positive interval")]
    InvalidInterval {
        /// Task key.
        key: String,
    },

    /// The engine was already shut down.
    #[error("engine is shut down")]
    ShutDown,

    /// Shutdown grace period was exceeded; some runs were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Keys of tasks that were still running.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::ShutDown.as_label(), "runtime_shut_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::IntervalMismatch { .. } => "runtime_interval_mismatch",
            RuntimeError::InvalidInterval { .. } => "runtime_invalid_interval",
            RuntimeError::ShutDown => "runtime_shut_down",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::IntervalMismatch {
                key,
                registered,
                requested,
            } => format!("interval mismatch for {key}: {registered:?} != {requested:?}"),
            RuntimeError::InvalidInterval { key } => format!("zero interval for {key}"),
            RuntimeError::ShutDown => "engine shut down".to_string(),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }
}

/// # Errors produced by a single run.
///
/// [`TaskError::Fail`] is what a task body (or a condition) returns.
/// [`TaskError::Terminated`] is raised by the overrun watchdog only; the two are
/// mutually exclusive for one run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The body failed; it is retried on its next natural tick.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The body overran `factor × interval` and was abandoned.
    #[error("task '{task}' terminated after {limit:?} (interval {interval:?})")]
    Terminated {
        /// Task key.
        task: String,
        /// Configured interval of the task.
        interval: Duration,
        /// Overrun threshold that was hit.
        limit: Duration,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use tickvisor::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Terminated { .. } => "task_terminated",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Terminated { task, limit, .. } => {
                format!("terminated: {task} overran {limit:?}")
            }
        }
    }

    /// True for watchdog terminations.
    pub fn is_termination(&self) -> bool {
        matches!(self, TaskError::Terminated { .. })
    }
}

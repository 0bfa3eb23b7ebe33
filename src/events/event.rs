//! # Lifecycle events emitted by task runners and the engine.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Tick events**: one per transition of a single tick (init, skip reasons, start, outcome, finish)
//! - **Dependency events**: availability changes observed by the dependency gate
//! - **Subscriber events**: fan-out problems (overflow, panic)
//! - **Shutdown events**: engine teardown progress
//!
//! The [`Event`] struct carries the metadata: timestamp, task key, interval,
//! elapsed time, failure reason and the names of failed conditions / unavailable dependencies.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ConditionsNotMet)
//!     .with_task("Billing.sync")
//!     .with_names(["hasWork"]);
//!
//! assert_eq!(ev.task.as_deref(), Some("Billing.sync"));
//! assert_eq!(ev.channel(), "Billing.sync:conditions_not_met");
//! assert_eq!(&*ev.names[0], "hasWork");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Tick events ===
    /// First tick ever observed for a task key (emitted once per runner).
    ///
    /// Sets: `task`, `interval`
    Init,

    /// Tick skipped because the task is disabled.
    ///
    /// Sets: `task`
    Stopped,

    /// Tick skipped because required dependencies are down.
    ///
    /// Sets: `task`, `names` (unavailable dependencies)
    MicroservicesUnresponsive,

    /// Tick skipped because one or more conditions failed.
    ///
    /// Sets: `task`, `names` (failed conditions, declaration order)
    ConditionsNotMet,

    /// Tick skipped because a previous run still holds the guard.
    ///
    /// Sets: `task`
    AlreadyRunning,

    /// The body is about to run.
    ///
    /// Sets: `task`, `interval`
    Started,

    /// The body completed after its interval had elapsed (informational).
    ///
    /// Sets: `task`, `interval`, `elapsed`
    LongRunning,

    /// The body completed successfully.
    ///
    /// Sets: `task`, `elapsed`
    Success,

    /// The body returned an error.
    ///
    /// Sets: `task`, `elapsed`, `reason`
    Error,

    /// The watchdog abandoned an overrunning body.
    ///
    /// Sets: `task`, `interval`, `elapsed`, `reason`
    Terminated,

    /// Run finished, guard released. Follows every `Started`.
    ///
    /// Sets: `task`, `elapsed`
    Finish,

    // === Dependency events ===
    /// A dependency came back.
    ///
    /// Sets: `names` (the dependency)
    DependencyAvailable,

    /// A dependency went away.
    ///
    /// Sets: `names` (the dependency)
    DependencyUnavailable,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All in-flight ticks finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some runs were still in flight.
    GraceExceeded,
}

impl EventKind {
    /// Short stable label (snake_case) used for event channels and logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Stopped => "stopped",
            EventKind::MicroservicesUnresponsive => "microservices_unresponsive",
            EventKind::ConditionsNotMet => "conditions_not_met",
            EventKind::AlreadyRunning => "already_running",
            EventKind::Started => "started",
            EventKind::LongRunning => "long_running",
            EventKind::Success => "success",
            EventKind::Error => "error",
            EventKind::Terminated => "terminated",
            EventKind::Finish => "finish",
            EventKind::DependencyAvailable => "dependency_available",
            EventKind::DependencyUnavailable => "dependency_unavailable",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within",
            EventKind::GraceExceeded => "grace_exceeded",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task key (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Configured interval of the task.
    pub interval: Option<Duration>,
    /// Time spent in the run.
    pub elapsed: Option<Duration>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Failed condition names or unavailable dependency names.
    pub names: Arc<[Arc<str>]>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            interval: None,
            elapsed: None,
            reason: None,
            names: Arc::from(Vec::new()),
        }
    }

    /// Attaches a task key.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the task interval.
    #[inline]
    pub fn with_interval(mut self, d: Duration) -> Self {
        self.interval = Some(d);
        self
    }

    /// Attaches elapsed run time.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches condition or dependency names.
    #[inline]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Channel name: `"<Type>.<method>:<label>"`, or just the label for engine-wide events.
    pub fn channel(&self) -> String {
        match self.task.as_deref() {
            Some(task) => format!("{task}:{}", self.kind.as_label()),
            None => self.kind.as_label().to_string(),
        }
    }

    /// Interval in whole milliseconds (for logs and metrics).
    #[inline]
    pub fn interval_ms(&self) -> Option<u64> {
        self.interval.map(as_millis)
    }

    /// Elapsed time in whole milliseconds (for logs and metrics).
    #[inline]
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed.map(as_millis)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}

fn as_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

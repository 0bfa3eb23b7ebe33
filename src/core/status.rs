//! # Status registry: per-task records and derived health.
//!
//! Keeps one [`TaskRecord`] per task key, updated from lifecycle events, and derives a
//! [`TaskStatus`] snapshot on demand.
//!
//! ## Architecture
//! ```text
//! TaskRunner ──► emit(Event) ──► StatusRegistry::apply(&Event)      (synchronous)
//!                    └─────────► Bus ──► SubscriberSet               (fan-out)
//!
//! report() ──► [TaskStatus]   (detached clones; derived on every call)
//! ```
//!
//! ## Status precedence (highest first)
//! ```text
//! MicroservicesUnavailable  record.microservices_unavailable
//! ConditionsNotMet          !record.not_met_conditions.is_empty()
//! Error                     record.last_error.is_some()   (cleared by Success)
//! Jammed                    locked and running for >= jam_factor × interval
//! Running                   locked
//! Slow                      last_duration >= interval and the run was not terminated
//! Stopped                   disabled
//! Healthy                   at least one success
//! Late                      never started and late_factor × interval since creation
//! Init                      otherwise
//! ```
//!
//! ## Rules
//! - Events only touch the record of their own key
//! - Records are created by [`StatusRegistry::register`] or on the first `Init`/`Started` event
//! - Records are never removed

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::core::config::Config;
use crate::events::{Event, EventKind};

/// Derived health of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// A required dependency is down.
    MicroservicesUnavailable,
    /// At least one condition failed on the last tick.
    ConditionsNotMet,
    /// The last run failed or was terminated, with no success since.
    Error,
    /// A run holds the guard far longer than its interval.
    Jammed,
    /// A run holds the guard.
    Running,
    /// The last run took at least one interval.
    Slow,
    /// The task is disabled.
    Stopped,
    /// Runs succeed.
    Healthy,
    /// Registered, but no run was observed within the expected window.
    Late,
    /// Never run yet.
    Init,
}

impl StatusKind {
    /// Short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            StatusKind::MicroservicesUnavailable => "microservices_unavailable",
            StatusKind::ConditionsNotMet => "conditions_not_met",
            StatusKind::Error => "error",
            StatusKind::Jammed => "jammed",
            StatusKind::Running => "running",
            StatusKind::Slow => "slow",
            StatusKind::Stopped => "stopped",
            StatusKind::Healthy => "healthy",
            StatusKind::Late => "late",
            StatusKind::Init => "init",
        }
    }

    /// Stable numeric code for metrics gauges.
    pub fn code(&self) -> u8 {
        match self {
            StatusKind::Healthy => 0,
            StatusKind::Init => 1,
            StatusKind::Running => 2,
            StatusKind::Slow => 3,
            StatusKind::Late => 4,
            StatusKind::Stopped => 5,
            StatusKind::ConditionsNotMet => 6,
            StatusKind::MicroservicesUnavailable => 7,
            StatusKind::Error => 8,
            StatusKind::Jammed => 9,
        }
    }
}

/// Mutable per-task record. Only [`StatusRegistry::apply`] writes it.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Configured interval.
    pub interval: Duration,
    /// When the record was created.
    pub create_time: Instant,
    /// Start of the latest run.
    pub last_start: Option<Instant>,
    /// Duration of the latest finished run.
    pub last_duration: Option<Duration>,
    /// A run currently holds the guard.
    pub locked: bool,
    /// Error of the latest failed or terminated run; cleared by a success.
    pub last_error: Option<String>,
    /// Conditions that failed on the latest tick.
    pub not_met_conditions: Vec<String>,
    /// Required dependencies were down on the latest tick.
    pub microservices_unavailable: bool,
    /// The task is enabled.
    pub enabled: bool,
    /// The latest finished run was terminated by the watchdog.
    pub terminated: bool,
    /// Runs started.
    pub runs: u64,
    /// Successful runs.
    pub successes: u64,
    /// Failed runs.
    pub errors: u64,
    /// Terminated runs.
    pub terminations: u64,
}

impl TaskRecord {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            create_time: Instant::now(),
            last_start: None,
            last_duration: None,
            locked: false,
            last_error: None,
            not_met_conditions: Vec::new(),
            microservices_unavailable: false,
            enabled: true,
            terminated: false,
            runs: 0,
            successes: 0,
            errors: 0,
            terminations: 0,
        }
    }

    fn clear_skip(&mut self) {
        self.enabled = true;
        self.microservices_unavailable = false;
        self.not_met_conditions.clear();
    }
}

/// Read-only health snapshot of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    /// Task key.
    pub key: String,
    /// Derived status.
    pub status: StatusKind,
    /// A run currently holds the guard.
    pub locked: bool,
    /// Duration of the latest finished run.
    pub last_duration: Option<Duration>,
    /// Error of the latest failed or terminated run.
    pub last_error: Option<String>,
    /// Conditions that failed on the latest tick.
    pub not_met_conditions: Vec<String>,
    /// Required dependencies were down on the latest tick.
    pub microservices_unavailable: bool,
    /// Successful runs so far.
    pub successes: u64,
    /// Failed runs so far.
    pub errors: u64,
    /// Runs terminated by the watchdog so far.
    pub terminations: u64,
}

/// Thread-safe registry of task records.
pub struct StatusRegistry {
    records: RwLock<HashMap<String, TaskRecord>>,
    cfg: Config,
}

impl StatusRegistry {
    /// Creates an empty registry using the jam/late thresholds from `cfg`.
    pub fn new(cfg: &Config) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cfg: cfg.clone(),
        }
    }

    /// Creates the record for `key` if absent. Returns `true` if it was created.
    pub fn register(&self, key: &str, interval: Duration) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(key) {
            return false;
        }
        records.insert(key.to_string(), TaskRecord::new(interval));
        true
    }

    /// Applies one lifecycle event to the record of its task.
    pub fn apply(&self, ev: &Event) {
        let Some(key) = ev.task.as_deref() else {
            return;
        };
        let now = Instant::now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        if matches!(ev.kind, EventKind::Init | EventKind::Started) && !records.contains_key(key) {
            let interval = ev.interval.unwrap_or_default();
            records.insert(key.to_string(), TaskRecord::new(interval));
        }
        let Some(rec) = records.get_mut(key) else {
            return;
        };

        match ev.kind {
            EventKind::Stopped => {
                rec.enabled = false;
                rec.microservices_unavailable = false;
                rec.not_met_conditions.clear();
            }
            EventKind::MicroservicesUnresponsive => {
                rec.clear_skip();
                rec.microservices_unavailable = true;
            }
            EventKind::ConditionsNotMet => {
                rec.clear_skip();
                rec.not_met_conditions = ev.names.iter().map(|n| n.to_string()).collect();
            }
            EventKind::AlreadyRunning => rec.clear_skip(),
            EventKind::Started => {
                rec.clear_skip();
                rec.locked = true;
                rec.last_start = Some(now);
                rec.runs += 1;
            }
            EventKind::Success => {
                rec.last_duration = ev.elapsed;
                rec.last_error = None;
                rec.terminated = false;
                rec.successes += 1;
            }
            EventKind::Error => {
                rec.last_duration = ev.elapsed;
                rec.last_error = ev.reason.as_deref().map(str::to_string);
                rec.terminated = false;
                rec.errors += 1;
            }
            EventKind::Terminated => {
                rec.last_duration = ev.elapsed;
                rec.last_error = ev.reason.as_deref().map(str::to_string);
                rec.terminated = true;
                rec.terminations += 1;
            }
            EventKind::Finish => rec.locked = false,
            _ => {}
        }
    }

    /// Copy of the record for `key`.
    pub fn record(&self, key: &str) -> Option<TaskRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(key).cloned()
    }

    /// Derived status of `key`.
    pub fn status(&self, key: &str) -> Option<TaskStatus> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        records.get(key).map(|rec| self.derive(key, rec, now))
    }

    /// One status per known key, sorted by key.
    pub fn report(&self) -> Vec<TaskStatus> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let mut out: Vec<TaskStatus> = records
            .iter()
            .map(|(key, rec)| self.derive(key, rec, now))
            .collect();
        out.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Sorted keys of tasks whose run currently holds the guard.
    pub fn locked(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = records
            .iter()
            .filter(|(_, rec)| rec.locked)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    fn derive(&self, key: &str, rec: &TaskRecord, now: Instant) -> TaskStatus {
        TaskStatus {
            key: key.to_string(),
            status: self.classify(rec, now),
            locked: rec.locked,
            last_duration: rec.last_duration,
            last_error: rec.last_error.clone(),
            not_met_conditions: rec.not_met_conditions.clone(),
            microservices_unavailable: rec.microservices_unavailable,
            successes: rec.successes,
            errors: rec.errors,
            terminations: rec.terminations,
        }
    }

    fn classify(&self, rec: &TaskRecord, now: Instant) -> StatusKind {
        let jam = self.cfg.jam_threshold(rec.interval);
        let late = self.cfg.late_threshold(rec.interval);
        let running_for = rec
            .last_start
            .map(|start| now.saturating_duration_since(start));

        if rec.microservices_unavailable {
            StatusKind::MicroservicesUnavailable
        } else if !rec.not_met_conditions.is_empty() {
            StatusKind::ConditionsNotMet
        } else if rec.last_error.is_some() {
            StatusKind::Error
        } else if rec.locked && running_for.is_some_and(|d| d >= jam) {
            StatusKind::Jammed
        } else if rec.locked {
            StatusKind::Running
        } else if !rec.terminated && rec.last_duration.is_some_and(|d| d >= rec.interval) {
            StatusKind::Slow
        } else if !rec.enabled {
            StatusKind::Stopped
        } else if rec.successes > 0 {
            StatusKind::Healthy
        } else if rec.last_start.is_none()
            && now.saturating_duration_since(rec.create_time) >= late
        {
            StatusKind::Late
        } else {
            StatusKind::Init
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    const KEY: &str = "Billing.sync";

    fn registry() -> StatusRegistry {
        let reg = StatusRegistry::new(&Config::default());
        reg.register(KEY, Duration::from_secs(1));
        reg
    }

    fn ev(kind: EventKind) -> Event {
        Event::new(kind)
            .with_task(KEY)
            .with_interval(Duration::from_secs(1))
    }

    fn status(reg: &StatusRegistry) -> StatusKind {
        reg.status(KEY).map(|s| s.status).expect("known key")
    }

    #[tokio::test(start_paused = true)]
    async fn register_is_idempotent() {
        let reg = registry();
        assert!(!reg.register(KEY, Duration::from_secs(1)));
        assert_eq!(reg.report().len(), 1);
        assert_eq!(status(&reg), StatusKind::Init);
    }

    #[tokio::test(start_paused = true)]
    async fn success_flow_reaches_healthy() {
        let reg = registry();
        reg.apply(&ev(EventKind::Started));
        assert_eq!(status(&reg), StatusKind::Running);

        reg.apply(&ev(EventKind::Success).with_elapsed(Duration::from_millis(200)));
        reg.apply(&ev(EventKind::Finish));

        let st = reg.status(KEY).expect("status");
        assert_eq!(st.status, StatusKind::Healthy);
        assert_eq!(st.last_duration, Some(Duration::from_millis(200)));
        assert_eq!(st.successes, 1);
        assert!(!st.locked);
    }

    #[tokio::test(start_paused = true)]
    async fn error_until_next_success() {
        let reg = registry();
        reg.apply(&ev(EventKind::Started));
        reg.apply(&ev(EventKind::Error).with_reason("boom").with_elapsed(Duration::from_millis(5)));
        reg.apply(&ev(EventKind::Finish));
        assert_eq!(status(&reg), StatusKind::Error);
        assert_eq!(
            reg.status(KEY).and_then(|s| s.last_error).as_deref(),
            Some("boom")
        );

        reg.apply(&ev(EventKind::Started));
        reg.apply(&ev(EventKind::Success).with_elapsed(Duration::from_millis(5)));
        reg.apply(&ev(EventKind::Finish));
        assert_eq!(status(&reg), StatusKind::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_reasons_take_precedence() {
        let reg = registry();
        reg.apply(&ev(EventKind::Error).with_reason("old"));
        reg.apply(&ev(EventKind::ConditionsNotMet).with_names(["hasWork"]));
        assert_eq!(status(&reg), StatusKind::ConditionsNotMet);
        assert_eq!(
            reg.status(KEY).map(|s| s.not_met_conditions),
            Some(vec!["hasWork".to_string()])
        );

        reg.apply(&ev(EventKind::MicroservicesUnresponsive).with_names(["PaymentService"]));
        let st = reg.status(KEY).expect("status");
        assert_eq!(st.status, StatusKind::MicroservicesUnavailable);
        assert!(st.not_met_conditions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_lock_is_jammed() {
        let reg = registry();
        reg.apply(&ev(EventKind::Started));
        time::advance(Duration::from_millis(1999)).await;
        assert_eq!(status(&reg), StatusKind::Running);
        time::advance(Duration::from_millis(1)).await;
        assert_eq!(status(&reg), StatusKind::Jammed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_but_not_terminated() {
        let reg = registry();
        reg.apply(&ev(EventKind::Started));
        reg.apply(&ev(EventKind::Success).with_elapsed(Duration::from_millis(1500)));
        reg.apply(&ev(EventKind::Finish));
        assert_eq!(status(&reg), StatusKind::Slow);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_millisecond_overrun_is_slow() {
        let reg = StatusRegistry::new(&Config::default());
        reg.register(KEY, Duration::from_micros(800));
        let ev = |kind| {
            Event::new(kind)
                .with_task(KEY)
                .with_interval(Duration::from_micros(800))
        };

        reg.apply(&ev(EventKind::Started));
        reg.apply(&ev(EventKind::Success).with_elapsed(Duration::from_micros(1500)));
        reg.apply(&ev(EventKind::Finish));

        let st = reg.status(KEY).expect("status");
        assert_eq!(st.status, StatusKind::Slow);
        assert_eq!(st.last_duration, Some(Duration::from_micros(1500)));
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_counters_accumulate() {
        let reg = registry();
        for kind in [EventKind::Success, EventKind::Error, EventKind::Error, EventKind::Terminated] {
            reg.apply(&ev(EventKind::Started));
            reg.apply(&ev(kind).with_reason("boom").with_elapsed(Duration::from_millis(5)));
            reg.apply(&ev(EventKind::Finish));
        }

        let st = reg.status(KEY).expect("status");
        assert_eq!((st.successes, st.errors, st.terminations), (1, 2, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn never_started_becomes_late() {
        let reg = registry();
        time::advance(Duration::from_secs(2)).await;
        assert_eq!(status(&reg), StatusKind::Late);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_is_stopped() {
        let reg = registry();
        reg.apply(&ev(EventKind::Stopped));
        assert_eq!(status(&reg), StatusKind::Stopped);
        reg.apply(&ev(EventKind::Started));
        assert_eq!(status(&reg), StatusKind::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn events_never_cross_keys() {
        let reg = registry();
        reg.register("Mailer.flush", Duration::from_secs(1));
        reg.apply(&Event::new(EventKind::Started).with_task("Mailer.flush"));
        assert_eq!(status(&reg), StatusKind::Init);
        assert_eq!(reg.locked(), vec!["Mailer.flush".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_key_created_on_init() {
        let reg = StatusRegistry::new(&Config::default());
        reg.apply(&Event::new(EventKind::Success).with_task("Ghost.run"));
        assert!(reg.record("Ghost.run").is_none());
        reg.apply(
            &Event::new(EventKind::Init)
                .with_task("Ghost.run")
                .with_interval(Duration::from_millis(250)),
        );
        assert_eq!(
            reg.record("Ghost.run").map(|r| r.interval),
            Some(Duration::from_millis(250))
        );
    }
}

//! # LogWriter: lifecycle events as `tracing` records
//!
//! A subscriber that renders every [`Event`] as a structured `tracing` record.
//!
//! | Level   | Events                                                               |
//! |---------|----------------------------------------------------------------------|
//! | `debug` | `Init`, `Stopped`, `AlreadyRunning`, `Started`, `Success`, `Finish`  |
//! | `info`  | `ConditionsNotMet`, `MicroservicesUnresponsive` (throttled), dependency transitions, shutdown |
//! | `warn`  | `LongRunning`, `Error`, `Terminated`, subscriber overflow/panic, grace exceeded |
//!
//! Skip logs (`ConditionsNotMet`, `MicroservicesUnresponsive`) are emitted at most once
//! per task and skip reason per `not_met_log_throttle`, and not at all during the
//! `startup_quiet` window after the writer is created, while dependency watchers settle.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG tickvisor: task started task=Billing.sync interval_ms=1000
//!  WARN tickvisor: task failed task=Billing.sync elapsed_ms=12 reason="execution failed: ledger unreachable"
//!  INFO tickvisor: dependency unavailable name=PaymentService
//!  INFO tickvisor: task skipped, dependencies unavailable task=Billing.sync names=["PaymentService"]
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::core::{Config, NOT_MET_LOG_THROTTLE, STARTUP_QUIET};
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
pub struct LogWriter {
    created: Instant,
    throttle: Duration,
    quiet: Duration,
    last_skip_log: Mutex<HashMap<(String, EventKind), Instant>>,
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::with_windows(NOT_MET_LOG_THROTTLE, STARTUP_QUIET)
    }
}

impl LogWriter {
    /// Construct a writer with the default throttle and quiet windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a writer using `cfg.not_met_log_throttle` and `cfg.startup_quiet`.
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self::with_windows(cfg.not_met_log_throttle, cfg.startup_quiet)
    }

    fn with_windows(throttle: Duration, quiet: Duration) -> Self {
        Self {
            created: Instant::now(),
            throttle,
            quiet,
            last_skip_log: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether a skip of `kind` for `task` gets logged at `now`.
    fn admit_skip(&self, task: &str, kind: EventKind, now: Instant) -> bool {
        if now.duration_since(self.created) < self.quiet {
            return false;
        }
        let mut last = self
            .last_skip_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (task.to_string(), kind);
        match last.get(&key) {
            Some(at) if now.duration_since(*at) < self.throttle => false,
            _ => {
                last.insert(key, now);
                true
            }
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let names: Vec<&str> = e.names.iter().map(|n| &**n).collect();

        match e.kind {
            EventKind::Init => {
                tracing::debug!(task, interval_ms = e.interval_ms(), "task initialised");
            }
            EventKind::Stopped => {
                tracing::debug!(task, "task disabled, tick skipped");
            }
            EventKind::MicroservicesUnresponsive => {
                if self.admit_skip(task, e.kind, Instant::now()) {
                    tracing::info!(task, ?names, "task skipped, dependencies unavailable");
                }
            }
            EventKind::ConditionsNotMet => {
                if self.admit_skip(task, e.kind, Instant::now()) {
                    tracing::info!(task, ?names, "task skipped, conditions not met");
                }
            }
            EventKind::AlreadyRunning => {
                tracing::debug!(task, "task skipped, previous run still in progress");
            }
            EventKind::Started => {
                tracing::debug!(task, interval_ms = e.interval_ms(), "task started");
            }
            EventKind::LongRunning => {
                tracing::warn!(
                    task,
                    interval_ms = e.interval_ms(),
                    elapsed_ms = e.elapsed_ms(),
                    "task ran longer than its interval"
                );
            }
            EventKind::Success => {
                tracing::debug!(task, elapsed_ms = e.elapsed_ms(), "task succeeded");
            }
            EventKind::Error => {
                tracing::warn!(
                    task,
                    elapsed_ms = e.elapsed_ms(),
                    reason = e.reason.as_deref(),
                    "task failed"
                );
            }
            EventKind::Terminated => {
                tracing::warn!(
                    task,
                    elapsed_ms = e.elapsed_ms(),
                    reason = e.reason.as_deref(),
                    "task terminated"
                );
            }
            EventKind::Finish => {
                tracing::debug!(task, elapsed_ms = e.elapsed_ms(), "task finished");
            }
            EventKind::DependencyAvailable => {
                tracing::info!(name = names.first().copied(), "dependency available");
            }
            EventKind::DependencyUnavailable => {
                tracing::info!(name = names.first().copied(), "dependency unavailable");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = task, info = e.reason.as_deref(), "subscriber panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason = e.reason.as_deref(), "subscriber overflow");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("all tasks stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(stuck = ?names, "shutdown grace exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn writer() -> LogWriter {
        LogWriter::with_windows(Duration::from_secs(60), Duration::from_secs(30))
    }

    const NOT_MET: EventKind = EventKind::ConditionsNotMet;
    const UNRESPONSIVE: EventKind = EventKind::MicroservicesUnresponsive;

    #[tokio::test(start_paused = true)]
    async fn skips_are_muted_during_startup() {
        let w = writer();
        assert!(!w.admit_skip("Billing.sync", NOT_MET, Instant::now()));

        time::advance(Duration::from_secs(30)).await;
        assert!(w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_are_throttled_per_task() {
        let w = writer();
        time::advance(Duration::from_secs(30)).await;

        assert!(w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
        assert!(!w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
        assert!(w.admit_skip("Mailer.flush", NOT_MET, Instant::now()));

        time::advance(Duration::from_secs(59)).await;
        assert!(!w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
        time::advance(Duration::from_secs(1)).await;
        assert!(w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn new_skip_reason_is_logged_within_throttle() {
        let w = writer();
        time::advance(Duration::from_secs(30)).await;

        assert!(w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
        time::advance(Duration::from_secs(5)).await;
        assert!(w.admit_skip("Billing.sync", UNRESPONSIVE, Instant::now()));
        assert!(!w.admit_skip("Billing.sync", UNRESPONSIVE, Instant::now()));
        assert!(!w.admit_skip("Billing.sync", NOT_MET, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn renders_every_kind_without_panicking() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("tickvisor=debug")
            .with_test_writer()
            .try_init();

        let w = LogWriter::from_config(&Config::default());
        for kind in [
            EventKind::Init,
            EventKind::ConditionsNotMet,
            EventKind::Error,
            EventKind::Terminated,
            EventKind::DependencyUnavailable,
            EventKind::GraceExceeded,
        ] {
            let ev = Event::new(kind)
                .with_task("Billing.sync")
                .with_names(["PaymentService"])
                .with_reason("boom");
            w.on_event(&ev).await;
        }
    }
}

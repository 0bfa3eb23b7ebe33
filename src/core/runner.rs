//! # Run a single tick of a recurring task.
//!
//! [`TaskRunner::run`] walks one tick through the gates, the guard and the watchdog,
//! publishing lifecycle events along the way.
//!
//! ## Event flow
//!
//! ```text
//! Init (once per runner)
//!   │
//!   ├─ disabled ─────────────────────────────► Stopped
//!   ├─ required dependency down ─────────────► MicroservicesUnresponsive
//!   ├─ condition failed/timed out ───────────► ConditionsNotMet
//!   ├─ guard held ───────────────────────────► AlreadyRunning
//!   │
//!   └─ Started ─► watchdog(body)
//!                   ├─ Ok  ─► [LongRunning] ─► Success
//!                   ├─ Err ─► on_error ─────► Error
//!                   └─ overrun ─► on_terminate ─► Terminated
//!                 finally ─► Finish ─► guard released
//! ```
//!
//! ## Rules
//! - Skipped ticks are not runs: no guard, no `Started`, nothing queued
//! - `on_error` and `on_terminate` are mutually exclusive for one run
//! - Every `Started` is followed by exactly one of `Success`/`Error`/`Terminated`, then `Finish`
//! - `Finish` is published before the guard is released, so a following tick's
//!   `Started` can never be overtaken by it
//! - Hook panics are caught and logged; they never skip `Finish` or the release

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::conditions::ConditionEvaluator;
use crate::core::config::Config;
use crate::core::dependencies::{DEPENDENCIES_AVAILABLE, DependenciesAvailable, DependencyGate};
use crate::core::guard::ExecutionGuard;
use crate::core::status::StatusRegistry;
use crate::core::watchdog::{WatchOutcome, Watchdog};
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{ConditionRef, TaskDefinition};

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Task disabled.
    Stopped,
    /// Required dependencies down (names in declaration order).
    MicroservicesUnavailable(Vec<Arc<str>>),
    /// Conditions failed (names in declaration order).
    ConditionsNotMet(Vec<Arc<str>>),
    /// A previous run still holds the guard.
    AlreadyRunning,
    /// The body succeeded.
    Success {
        /// Body duration.
        elapsed: Duration,
        /// The body took at least one interval.
        long_running: bool,
    },
    /// The body failed.
    Error {
        /// The body's error.
        error: TaskError,
        /// Body duration.
        elapsed: Duration,
    },
    /// The watchdog abandoned the body.
    Terminated {
        /// The termination error.
        error: TaskError,
        /// Time until termination.
        elapsed: Duration,
    },
}

impl TickOutcome {
    /// True if the body was started on this tick.
    pub fn ran(&self) -> bool {
        matches!(
            self,
            TickOutcome::Success { .. } | TickOutcome::Error { .. } | TickOutcome::Terminated { .. }
        )
    }
}

/// Collaborators shared by every runner of one engine.
#[derive(Clone)]
pub(crate) struct RunnerContext {
    pub cfg: Config,
    pub bus: Bus,
    pub status: Arc<StatusRegistry>,
    pub gate: Arc<DependencyGate>,
    pub guard: Arc<ExecutionGuard>,
    pub token: CancellationToken,
}

impl RunnerContext {
    /// Updates the status record, then publishes on the bus.
    fn emit(&self, ev: Event) {
        self.status.apply(&ev);
        self.bus.publish(ev);
    }
}

/// Executes ticks of one [`TaskDefinition`].
pub struct TaskRunner {
    def: TaskDefinition,
    key: Arc<str>,
    conditions: Vec<(Arc<str>, ConditionRef)>,
    evaluator: ConditionEvaluator,
    watchdog: Watchdog,
    ctx: RunnerContext,
    enabled: AtomicBool,
    init_sent: AtomicBool,
}

impl TaskRunner {
    pub(crate) fn new(def: TaskDefinition, ctx: RunnerContext) -> Self {
        let key = def.key().as_arc();

        let mut conditions = def.conditions().to_vec();
        if !def.required_dependencies().is_empty() {
            let synthetic: ConditionRef = Arc::new(DependenciesAvailable {
                gate: Arc::clone(&ctx.gate),
                required: def.required_dependencies().to_vec(),
            });
            conditions.push((Arc::from(DEPENDENCIES_AVAILABLE), synthetic));
        }

        let evaluator = ConditionEvaluator::new(ctx.cfg.condition_timeout());
        let watchdog = Watchdog::new(
            def.key().as_str(),
            def.interval(),
            ctx.cfg.overrun_limit(def.interval()),
        );
        let enabled = AtomicBool::new(def.enabled());

        Self {
            def,
            key,
            conditions,
            evaluator,
            watchdog,
            ctx,
            enabled,
            init_sent: AtomicBool::new(false),
        }
    }

    /// The definition this runner executes.
    pub fn definition(&self) -> &TaskDefinition {
        &self.def
    }

    /// Enables or disables future ticks. A run in flight is not affected.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// True if ticks may run.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Runs one tick.
    pub async fn run(&self) -> TickOutcome {
        let interval = self.def.interval();

        if !self.init_sent.swap(true, Ordering::SeqCst) {
            self.ctx.emit(self.event(EventKind::Init).with_interval(interval));
        }

        if !self.is_enabled() {
            self.ctx.emit(self.event(EventKind::Stopped));
            return TickOutcome::Stopped;
        }

        let down = self.ctx.gate.unavailable_among(self.def.required_dependencies());
        if !down.is_empty() {
            self.ctx.emit(
                self.event(EventKind::MicroservicesUnresponsive)
                    .with_names(down.iter().cloned()),
            );
            return TickOutcome::MicroservicesUnavailable(down);
        }

        let failed = self.evaluator.evaluate(&self.conditions).await;
        if !failed.is_empty() {
            self.ctx.emit(
                self.event(EventKind::ConditionsNotMet)
                    .with_names(failed.iter().cloned()),
            );
            return TickOutcome::ConditionsNotMet(failed);
        }

        let Some(permit) = self.ctx.guard.try_acquire(&self.key) else {
            self.ctx.emit(self.event(EventKind::AlreadyRunning));
            return TickOutcome::AlreadyRunning;
        };

        let started = Instant::now();
        self.ctx.emit(self.event(EventKind::Started).with_interval(interval));

        let outcome = match self.watchdog.watch(self.def.task().as_ref(), &self.ctx.token).await {
            WatchOutcome::Completed {
                result: Ok(()),
                elapsed,
            } => {
                let long_running = elapsed >= interval;
                if long_running {
                    self.ctx.emit(
                        self.event(EventKind::LongRunning)
                            .with_interval(interval)
                            .with_elapsed(elapsed),
                    );
                }
                self.ctx.emit(self.event(EventKind::Success).with_elapsed(elapsed));
                TickOutcome::Success {
                    elapsed,
                    long_running,
                }
            }
            WatchOutcome::Completed {
                result: Err(error),
                elapsed,
            } => {
                if let Some(hook) = self.def.on_error() {
                    self.call_hook("on_error", hook(error.clone())).await;
                }
                self.ctx.emit(
                    self.event(EventKind::Error)
                        .with_elapsed(elapsed)
                        .with_reason(error.to_string()),
                );
                TickOutcome::Error { error, elapsed }
            }
            WatchOutcome::Terminated { error, elapsed } => {
                if let Some(hook) = self.def.on_terminate() {
                    self.call_hook("on_terminate", hook(error.clone())).await;
                }
                self.ctx.emit(
                    self.event(EventKind::Terminated)
                        .with_interval(interval)
                        .with_elapsed(elapsed)
                        .with_reason(error.to_string()),
                );
                TickOutcome::Terminated { error, elapsed }
            }
        };

        if let Some(hook) = self.def.finally() {
            self.call_hook("finally", hook()).await;
        }

        self.ctx
            .emit(self.event(EventKind::Finish).with_elapsed(started.elapsed()));
        permit.release();
        outcome
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_task(Arc::clone(&self.key))
    }

    async fn call_hook<F: Future<Output = ()>>(&self, hook: &'static str, fut: F) {
        if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
            tracing::warn!(task = %self.key, hook, "hook panicked");
        }
    }
}

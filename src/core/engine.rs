//! # Engine: registers recurring tasks, drives their schedules, shuts them down.
//!
//! The [`Engine`] owns the event bus, the [`SubscriberSet`], the [`StatusRegistry`],
//! the [`DependencyGate`] and the [`ExecutionGuard`]. Each registered
//! [`TaskDefinition`] becomes a [`TaskRunner`] driven by the [`Schedule`] collaborator.
//!
//! ## Key responsibilities
//! - validate and register task definitions (idempotent per key)
//! - subscribe to the [`Bus`] and **fan-out** events via [`SubscriberSet`]
//! - forward dependency availability to the gate
//! - perform graceful shutdown with a configurable [`Config::grace`]
//!
//! ## Architecture
//! ```text
//! register_task(def)
//!   ├─ interval == 0                   ─► Err(InvalidInterval)
//!   ├─ key known, other interval       ─► Err(IntervalMismatch)
//!   ├─ key known, same interval        ─► Ok(Existing)        (nothing scheduled)
//!   └─ new key ─► StatusRegistry::register
//!               TaskRunner::new(def, ctx)
//!               Schedule::schedule(key, interval, tick, token.child_token())
//!               ─► Ok(New)
//!
//! Event flow:
//!   TaskRunner ── StatusRegistry::apply ──► Bus ──► listener ──► SubscriberSet::emit
//!   DependencyGate ─────────────────────────► Bus
//!
//! Shutdown path:
//!   shutdown()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► token.cancel()   → schedule loops stop, running bodies see cancellation
//!     └─► wait for schedule handles within cfg.grace:
//!            ├─ all joined  → Bus.publish(AllStoppedWithin)
//!            └─ timeout     → Bus.publish(GraceExceeded), Err(GraceExceeded{stuck})
//!     └─► listener_stop.cancel() → listener forwards what is left on the bus,
//!                                  then SubscriberSet::shutdown drains every queue
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Config, Engine, TaskDefinition, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::builder(Config::default()).build();
//!     engine.init();
//!
//!     let sync = TaskDefinition::builder("Billing.sync", Duration::from_secs(1))
//!         .requires("PaymentService")
//!         .condition("hasWork", || async { Ok(true) })
//!         .build(|_ctx| async { Ok::<(), TaskError>(()) });
//!     engine.register_task(sync)?;
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    builder::EngineBuilder,
    config::Config,
    dependencies::DependencyGate,
    guard::ExecutionGuard,
    runner::{RunnerContext, TaskRunner, TickOutcome},
    scheduler::{Schedule, TickFn},
    shutdown,
    status::{StatusRegistry, TaskStatus},
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    tasks::TaskDefinition,
};

/// Result of a successful [`Engine::register_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The key was new; its schedule has started.
    New,
    /// The key was already registered with the same interval; nothing changed.
    Existing,
}

/// Recurring-task engine.
pub struct Engine {
    cfg: Config,
    bus: Bus,
    subs: Mutex<Option<SubscriberSet>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    status: Arc<StatusRegistry>,
    gate: Arc<DependencyGate>,
    guard: Arc<ExecutionGuard>,
    scheduler: Arc<dyn Schedule>,
    runners: RwLock<HashMap<Arc<str>, Arc<TaskRunner>>>,
    loops: Mutex<Vec<JoinHandle<()>>>,
    token: CancellationToken,
    listener_stop: CancellationToken,
    stopping: AtomicBool,
}

impl Engine {
    /// Creates an [`EngineBuilder`].
    pub fn builder(cfg: Config) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        status: Arc<StatusRegistry>,
        gate: Arc<DependencyGate>,
        guard: Arc<ExecutionGuard>,
        scheduler: Arc<dyn Schedule>,
        token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs: Mutex::new(Some(subs)),
            listener: Mutex::new(None),
            status,
            gate,
            guard,
            scheduler,
            runners: RwLock::new(HashMap::new()),
            loops: Mutex::new(Vec::new()),
            token,
            listener_stop: CancellationToken::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Starts event delivery to subscribers. Idempotent.
    ///
    /// Called implicitly by [`Engine::register_task`]; call it earlier to see dependency
    /// events published before the first registration.
    pub fn init(&self) {
        let Some(set) = self.subs.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };
        tracing::debug!(subscribers = set.len(), "engine initialised");
        if set.is_empty() {
            return;
        }
        let handle = self.subscriber_listener(set);
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Registers a recurring task and starts its schedule.
    ///
    /// Registering the same key again with the same interval is a no-op
    /// ([`Registration::Existing`]); with a different interval it fails.
    pub fn register_task(&self, def: TaskDefinition) -> Result<Registration, RuntimeError> {
        if self.token.is_cancelled() {
            return Err(RuntimeError::ShutDown);
        }
        let key = def.key().as_arc();
        let interval = def.interval();
        if interval.is_zero() {
            return Err(RuntimeError::InvalidInterval {
                key: key.to_string(),
            });
        }

        let runner = {
            let mut runners = self.runners.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = runners.get(&key) {
                let registered = existing.definition().interval();
                if registered != interval {
                    return Err(RuntimeError::IntervalMismatch {
                        key: key.to_string(),
                        registered,
                        requested: interval,
                    });
                }
                return Ok(Registration::Existing);
            }

            self.status.register(&key, interval);
            let runner = Arc::new(TaskRunner::new(def, self.runner_context()));
            runners.insert(Arc::clone(&key), Arc::clone(&runner));
            runner
        };

        self.init();
        let tick: TickFn = Arc::new(move || {
            let runner = Arc::clone(&runner);
            async move {
                runner.run().await;
            }
            .boxed()
        });
        let handle = self
            .scheduler
            .schedule(&key, interval, tick, self.token.child_token());
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);

        tracing::debug!(task = %key, ?interval, "task registered");
        Ok(Registration::New)
    }

    /// Marks a dependency available; returns `true` if its state changed.
    pub fn dependency_available(&self, name: &str) -> bool {
        self.gate.mark_available(name)
    }

    /// Marks a dependency unavailable; returns `true` if its state changed.
    pub fn dependency_unavailable(&self, name: &str) -> bool {
        self.gate.mark_unavailable(name)
    }

    /// True unless `name` is currently marked unavailable.
    pub fn is_dependency_available(&self, name: &str) -> bool {
        self.gate.is_available(name)
    }

    /// Sorted list of currently unavailable dependencies.
    pub fn unavailable_dependencies(&self) -> Vec<String> {
        self.gate.unavailable()
    }

    /// One status per registered task, sorted by key.
    pub fn status_report(&self) -> Vec<TaskStatus> {
        self.status.report()
    }

    /// Status of one task.
    pub fn status(&self, key: &str) -> Option<TaskStatus> {
        self.status.status(key)
    }

    /// Runs one tick of `key` now, through the same gates and guard as scheduled ticks.
    ///
    /// Returns `None` for an unknown key.
    pub async fn trigger(&self, key: &str) -> Option<TickOutcome> {
        let runner = self.runner(key)?;
        Some(runner.run().await)
    }

    /// Enables or disables future ticks of `key`. Returns `false` for an unknown key.
    pub fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        match self.runner(key) {
            Some(runner) => {
                runner.set_enabled(enabled);
                tracing::debug!(task = %key, enabled, "task toggled");
                true
            }
            None => false,
        }
    }

    /// Sorted keys of all registered tasks.
    pub fn tasks(&self) -> Vec<String> {
        let runners = self.runners.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = runners.keys().map(|k| k.to_string()).collect();
        keys.sort_unstable();
        keys
    }

    /// The runner of `key`, for driving ticks from a custom loop.
    pub fn runner(&self, key: &str) -> Option<Arc<TaskRunner>> {
        let runners = self.runners.read().unwrap_or_else(PoisonError::into_inner);
        runners.get(key).cloned()
    }

    /// A new receiver of the lifecycle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops all schedules and waits up to [`Config::grace`] for in-flight runs.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] and returns [`RuntimeError::GraceExceeded`] with the
    /// keys of runs still holding the guard. Either way, every event published so far
    /// has been handed to the subscribers when this returns. Later calls return
    /// `Ok(())` immediately.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let handles = std::mem::take(&mut *self.loops.lock().unwrap_or_else(PoisonError::into_inner));
        let grace = self.cfg.grace;

        let res = match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.status.locked();
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_names(stuck.iter().map(String::as_str)));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };
        self.close_subscribers().await;
        res
    }

    /// Stops the listener and waits, up to [`Config::grace`], for subscriber queues
    /// to drain.
    async fn close_subscribers(&self) {
        self.listener_stop.cancel();
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        let idle = self.subs.lock().unwrap_or_else(PoisonError::into_inner).take();

        let drained = async move {
            if let Some(handle) = listener {
                if let Err(err) = handle.await {
                    tracing::warn!(%err, "subscriber listener failed");
                }
            }
            if let Some(set) = idle {
                set.shutdown().await;
            }
        };
        if tokio::time::timeout(self.cfg.grace, drained).await.is_err() {
            tracing::warn!(grace = ?self.cfg.grace, "subscribers did not drain within grace");
        }
    }

    /// Waits for a termination signal (SIGINT/SIGTERM/SIGQUIT, Ctrl-C elsewhere), then
    /// shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        self.init();
        if let Err(err) = shutdown::wait_for_shutdown_signal().await {
            tracing::warn!(%err, "signal registration failed, shutting down");
        }
        self.shutdown().await
    }

    fn runner_context(&self) -> RunnerContext {
        RunnerContext {
            cfg: self.cfg.clone(),
            bus: self.bus.clone(),
            status: Arc::clone(&self.status),
            gate: Arc::clone(&self.gate),
            guard: Arc::clone(&self.guard),
            token: self.token.clone(),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Once stopped, forwards what is already queued on the bus and then shuts the set
    /// down, so every forwarded event is delivered before the task ends.
    fn subscriber_listener(&self, set: SubscriberSet) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let stop = self.listener_stop.clone();
        tokio::spawn(async move {
            loop {
                let res = tokio::select! {
                    biased;
                    res = rx.recv() => res,
                    _ = stop.cancelled() => break,
                };
                match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.token.cancel();
        self.listener_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::StatusKind;
    use crate::error::TaskError;
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time;

    fn quiet_config() -> Config {
        Config {
            log_events: false,
            ..Config::default()
        }
    }

    fn counting(key: &str, interval_ms: u64, work_ms: u64, runs: &Arc<AtomicUsize>) -> TaskDefinition {
        let runs = Arc::clone(runs);
        TaskDefinition::builder(key, Duration::from_millis(interval_ms)).build(move |_ctx| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_millis(work_ms)).await;
                Ok(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_registration_schedules_once() {
        let engine = Engine::builder(quiet_config()).build();
        let runs = Arc::new(AtomicUsize::new(0));

        assert_eq!(engine.register_task(counting("Billing.sync", 1000, 0, &runs)), Ok(Registration::New));
        assert_eq!(
            engine.register_task(counting("Billing.sync", 1000, 0, &runs)),
            Ok(Registration::Existing)
        );

        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(engine.tasks(), vec!["Billing.sync".to_string()]);
        assert_eq!(engine.status_report().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_bad_intervals() {
        let engine = Engine::builder(quiet_config()).build();
        let runs = Arc::new(AtomicUsize::new(0));

        assert_eq!(
            engine.register_task(counting("Billing.sync", 0, 0, &runs)),
            Err(RuntimeError::InvalidInterval {
                key: "Billing.sync".into()
            })
        );

        engine
            .register_task(counting("Billing.sync", 1000, 0, &runs))
            .expect("first registration");
        assert_eq!(
            engine.register_task(counting("Billing.sync", 2000, 0, &runs)),
            Err(RuntimeError::IntervalMismatch {
                key: "Billing.sync".into(),
                registered: Duration::from_millis(1000),
                requested: Duration::from_millis(2000),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped() {
        let engine = Engine::builder(quiet_config()).build();
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .register_task(counting("Billing.sync", 1000, 1500, &runs))
            .expect("register");

        // ticks at 1s (runs to 2.5s), 2s (skipped), 3s (runs)
        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        let st = engine.status("Billing.sync").expect("status");
        assert!(st.locked);
        assert_eq!(st.status, StatusKind::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn dependency_outage_pauses_and_resumes() {
        let engine = Engine::builder(quiet_config()).build();
        let runs = Arc::new(AtomicUsize::new(0));
        let def = {
            let runs = Arc::clone(&runs);
            TaskDefinition::builder("Billing.sync", Duration::from_secs(1))
                .requires("PaymentService")
                .build(move |_ctx| {
                    let runs = Arc::clone(&runs);
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
        };
        engine.register_task(def).expect("register");

        assert!(engine.dependency_unavailable("PaymentService"));
        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(
            engine.status("Billing.sync").map(|s| s.status),
            Some(StatusKind::MicroservicesUnavailable)
        );
        assert_eq!(engine.unavailable_dependencies(), vec!["PaymentService".to_string()]);
        assert!(!engine.is_dependency_available("PaymentService"));

        assert!(engine.dependency_available("PaymentService"));
        assert!(engine.is_dependency_available("PaymentService"));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            engine.status("Billing.sync").map(|s| s.status),
            Some(StatusKind::Healthy)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_and_toggle() {
        let engine = Engine::builder(quiet_config()).build();
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .register_task(counting("Billing.sync", 60_000, 0, &runs))
            .expect("register");

        assert!(engine.trigger("Billing.sync").await.is_some_and(|o| o.ran()));
        assert!(engine.trigger("Unknown.task").await.is_none());

        assert!(engine.set_enabled("Billing.sync", false));
        assert!(!engine.set_enabled("Unknown.task", false));
        assert_eq!(engine.trigger("Billing.sync").await, Some(TickOutcome::Stopped));
        assert_eq!(
            engine.status("Billing.sync").map(|s| s.status),
            Some(StatusKind::Stopped)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_within_grace() {
        let engine = Engine::builder(quiet_config()).build();
        let mut rx = engine.subscribe();
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .register_task(counting("Billing.sync", 1000, 500, &runs))
            .expect("register");

        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(engine.shutdown().await, Ok(()));
        assert_eq!(engine.shutdown().await, Ok(()));

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
        assert!(kinds.contains(&EventKind::Success));

        assert_eq!(
            engine.register_task(counting("Mailer.flush", 1000, 0, &runs)),
            Err(RuntimeError::ShutDown)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_stuck_runs() {
        let cfg = Config {
            grace: Duration::from_secs(1),
            termination_factor: 0,
            ..quiet_config()
        };
        let engine = Engine::builder(cfg).build();
        let stubborn = TaskDefinition::builder("Billing.sync", Duration::from_secs(1)).build(|_ctx| async {
            time::sleep(Duration::from_secs(5)).await;
            Ok::<(), TaskError>(())
        });
        engine.register_task(stubborn).expect("register");

        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            engine.shutdown().await,
            Err(RuntimeError::GraceExceeded {
                grace: Duration::from_secs(1),
                stuck: vec!["Billing.sync".to_string()],
            })
        );
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
        delay: Duration,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            self.seen.lock().expect("recorder lock").push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_lifecycle() {
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone()];
        let engine = Engine::builder(quiet_config()).with_subscribers(subs).build();
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .register_task(counting("Billing.sync", 1000, 0, &runs))
            .expect("register");

        time::sleep(Duration::from_millis(1100)).await;
        let seen = rec.seen.lock().expect("recorder lock").clone();
        assert_eq!(
            seen,
            vec![
                EventKind::Init,
                EventKind::Started,
                EventKind::Success,
                EventKind::Finish
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_subscriber_queues() {
        let rec = Arc::new(Recorder {
            delay: Duration::from_millis(50),
            ..Recorder::default()
        });
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone()];
        let engine = Engine::builder(quiet_config()).with_subscribers(subs).build();
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .register_task(counting("Billing.sync", 1000, 0, &runs))
            .expect("register");

        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(engine.shutdown().await, Ok(()));

        let seen = rec.seen.lock().expect("recorder lock").clone();
        assert!(seen.contains(&EventKind::ShutdownRequested));
        assert_eq!(seen.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_events_survive_log_throttling() {
        let cfg = Config {
            log_events: true,
            startup_quiet: Duration::from_secs(30),
            not_met_log_throttle: Duration::from_secs(60),
            ..Config::default()
        };
        let engine = Engine::builder(cfg).build();
        let mut rx = engine.subscribe();

        let idle = TaskDefinition::builder("Billing.sync", Duration::from_secs(1))
            .condition("hasWork", || async { Ok(false) })
            .build(|_ctx| async { Ok::<(), TaskError>(()) });
        let gated = TaskDefinition::builder("Ledger.close", Duration::from_secs(1))
            .requires("PaymentService")
            .build(|_ctx| async { Ok::<(), TaskError>(()) });
        engine.dependency_unavailable("PaymentService");
        engine.register_task(idle).expect("register");
        engine.register_task(gated).expect("register");

        time::sleep(Duration::from_millis(3100)).await;

        let mut not_met = 0;
        let mut unresponsive = 0;
        while let Ok(ev) = rx.try_recv() {
            match (ev.kind, ev.task.as_deref()) {
                (EventKind::ConditionsNotMet, Some("Billing.sync")) => not_met += 1,
                (EventKind::MicroservicesUnresponsive, Some("Ledger.close")) => unresponsive += 1,
                _ => {}
            }
        }
        assert_eq!(not_met, 3);
        assert_eq!(unresponsive, 3);
        assert_eq!(
            engine.status("Billing.sync").map(|s| s.status),
            Some(StatusKind::ConditionsNotMet)
        );
        assert_eq!(
            engine.status("Ledger.close").map(|s| s.status),
            Some(StatusKind::MicroservicesUnavailable)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_failures_report_every_interval() {
        let engine = Engine::builder(quiet_config()).build();
        let mut rx = engine.subscribe();
        let hooks = Arc::new(AtomicUsize::new(0));
        let def = TaskDefinition::builder("Billing.sync", Duration::from_secs(1))
            .on_error({
                let hooks = Arc::clone(&hooks);
                move |_err| {
                    let hooks = Arc::clone(&hooks);
                    async move {
                        hooks.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
            .build(|_ctx| async { Err(TaskError::fail("ledger unreachable")) });
        engine.register_task(def).expect("register");

        time::sleep(Duration::from_millis(3100)).await;

        let mut errors = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::Error {
                errors += 1;
            }
        }
        assert_eq!(errors, 3);
        assert_eq!(hooks.load(Ordering::SeqCst), 3);
        let st = engine.status("Billing.sync").expect("status");
        assert_eq!((st.errors, st.successes), (3, 0));
        assert_eq!(st.status, StatusKind::Error);
    }
}

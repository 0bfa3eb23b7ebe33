use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    config::Config,
    dependencies::DependencyGate,
    engine::Engine,
    guard::ExecutionGuard,
    scheduler::{IntervalScheduler, Schedule},
    status::StatusRegistry,
};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Engine`] with optional collaborators.
pub struct EngineBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    scheduler: Option<Arc<dyn Schedule>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            scheduler: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded queues.
    /// With the `logging` feature and `cfg.log_events`, a [`LogWriter`](crate::LogWriter)
    /// is appended automatically.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default [`IntervalScheduler`].
    pub fn with_scheduler(mut self, scheduler: impl Schedule) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Builds the engine.
    ///
    /// Spawns subscriber workers, so it must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Engine> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        #[allow(unused_mut)]
        let mut subscribers = self.subscribers;
        #[cfg(feature = "logging")]
        if self.cfg.log_events {
            subscribers.push(Arc::new(crate::subscribers::LogWriter::from_config(&self.cfg)));
        }
        let subs = SubscriberSet::new(subscribers, bus.clone());

        let status = Arc::new(StatusRegistry::new(&self.cfg));
        let gate = Arc::new(DependencyGate::new(bus.clone()));
        let guard = Arc::new(ExecutionGuard::new());
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(IntervalScheduler::new()));

        Arc::new(Engine::new_internal(
            self.cfg,
            bus,
            subs,
            status,
            gate,
            guard,
            scheduler,
            CancellationToken::new(),
        ))
    }
}

//! # Task definition.
//!
//! A [`TaskDefinition`] bundles everything the engine needs to run one recurring task:
//! key, interval, conditions, required dependencies, the body and the optional hooks.
//! It is built with [`TaskDefinitionBuilder`] and is immutable once registered.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{TaskDefinition, TaskError, TaskKey};
//!
//! let def = TaskDefinition::builder(TaskKey::new("Billing", "sync"), Duration::from_secs(1))
//!     .condition("hasWork", || async { Ok(true) })
//!     .requires("PaymentService")
//!     .on_error(|err: TaskError| async move { eprintln!("sync failed: {err}") })
//!     .build(|_ctx: CancellationToken| async { Ok::<(), TaskError>(()) });
//!
//! assert_eq!(def.key().as_str(), "Billing.sync");
//! assert_eq!(def.required_dependencies().len(), 1);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::condition::{ConditionFn, ConditionRef};
use crate::tasks::key::TaskKey;
use crate::tasks::task::TaskRef;
use crate::tasks::task_fn::TaskFn;

/// Hook receiving the error of a failed or terminated run.
pub type ErrorHook = Arc<dyn Fn(TaskError) -> BoxFuture<'static, ()> + Send + Sync>;

/// Hook run after every run that passed the guard.
pub type FinallyHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Everything needed to run one recurring task.
#[derive(Clone)]
pub struct TaskDefinition {
    key: TaskKey,
    interval: Duration,
    conditions: Vec<(Arc<str>, ConditionRef)>,
    dependencies: Vec<Arc<str>>,
    task: TaskRef,
    on_error: Option<ErrorHook>,
    on_terminate: Option<ErrorHook>,
    finally: Option<FinallyHook>,
    enabled: bool,
}

impl TaskDefinition {
    /// Creates a builder for the given key and interval.
    pub fn builder(key: impl Into<TaskKey>, interval: Duration) -> TaskDefinitionBuilder {
        TaskDefinitionBuilder::new(key, interval)
    }

    /// Task key.
    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// User conditions in declaration order.
    pub fn conditions(&self) -> &[(Arc<str>, ConditionRef)] {
        &self.conditions
    }

    /// Required dependency names in declaration order, without duplicates.
    pub fn required_dependencies(&self) -> &[Arc<str>] {
        &self.dependencies
    }

    /// Task body.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Error hook, if any.
    pub fn on_error(&self) -> Option<&ErrorHook> {
        self.on_error.as_ref()
    }

    /// Termination hook, if any.
    pub fn on_terminate(&self) -> Option<&ErrorHook> {
        self.on_terminate.as_ref()
    }

    /// Finally hook, if any.
    pub fn finally(&self) -> Option<&FinallyHook> {
        self.finally.as_ref()
    }

    /// Initial enabled state.
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions: Vec<&str> = self.conditions.iter().map(|(n, _)| &**n).collect();
        f.debug_struct("TaskDefinition")
            .field("key", &self.key)
            .field("interval", &self.interval)
            .field("conditions", &conditions)
            .field("dependencies", &self.dependencies)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TaskDefinition`] with fluent API.
#[derive(Clone)]
pub struct TaskDefinitionBuilder {
    key: TaskKey,
    interval: Duration,
    conditions: Vec<(Arc<str>, ConditionRef)>,
    dependencies: Vec<Arc<str>>,
    on_error: Option<ErrorHook>,
    on_terminate: Option<ErrorHook>,
    finally: Option<FinallyHook>,
    enabled: bool,
}

impl TaskDefinitionBuilder {
    /// Creates a new builder.
    pub fn new(key: impl Into<TaskKey>, interval: Duration) -> Self {
        Self {
            key: key.into(),
            interval,
            conditions: Vec::new(),
            dependencies: Vec::new(),
            on_error: None,
            on_terminate: None,
            finally: None,
            enabled: true,
        }
    }

    /// Adds a closure-backed condition. A later condition with the same name replaces the earlier one in place.
    pub fn condition<F, Fut>(self, name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, TaskError>> + Send + 'static,
    {
        self.condition_ref(name, ConditionFn::arc(f))
    }

    /// Adds an existing condition.
    pub fn condition_ref(mut self, name: impl Into<Arc<str>>, cond: ConditionRef) -> Self {
        let name = name.into();
        match self.conditions.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = cond,
            None => self.conditions.push((name, cond)),
        }
        self
    }

    /// Declares a required dependency.
    pub fn requires(mut self, name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// Hook invoked with the error of a failed run.
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TaskError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ErrorHook = Arc::new(move |err| f(err).boxed());
        self.on_error = Some(hook);
        self
    }

    /// Hook invoked with [`TaskError::Terminated`] when the watchdog abandons a run.
    pub fn on_terminate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TaskError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ErrorHook = Arc::new(move |err| f(err).boxed());
        self.on_terminate = Some(hook);
        self
    }

    /// Hook invoked after every run that acquired the guard.
    pub fn finally<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: FinallyHook = Arc::new(move || f().boxed());
        self.finally = Some(hook);
        self
    }

    /// Initial enabled state (default `true`).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the definition from a closure body.
    pub fn build<F, Fut>(self, f: F) -> TaskDefinition
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.build_from_task(TaskFn::arc(f))
    }

    /// Builds the definition from an existing body.
    pub fn build_from_task(self, task: TaskRef) -> TaskDefinition {
        TaskDefinition {
            key: self.key,
            interval: self.interval,
            conditions: self.conditions,
            dependencies: self.dependencies,
            task,
            on_error: self.on_error,
            on_terminate: self.on_terminate,
            finally: self.finally,
            enabled: self.enabled,
        }
    }
}

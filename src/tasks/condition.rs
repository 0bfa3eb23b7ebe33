//! # Run conditions.
//!
//! A [`Condition`] is a named async predicate that must hold for a tick to run.
//! [`ConditionFn`] adapts a closure, mirroring [`TaskFn`](crate::TaskFn).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Shared handle to a condition.
pub type ConditionRef = Arc<dyn Condition>;

/// Async predicate gating a task.
///
/// `Ok(false)`, `Err(_)`, a panic, or exceeding the evaluator timeout all count as "not met".
#[async_trait]
pub trait Condition: Send + Sync + 'static {
    /// Evaluates the predicate.
    async fn check(&self) -> Result<bool, TaskError>;
}

/// Function-backed condition.
///
/// # Example
/// ```
/// use tickvisor::{ConditionFn, ConditionRef};
///
/// let has_work: ConditionRef = ConditionFn::arc(|| async { Ok(true) });
/// # let _ = has_work;
/// ```
pub struct ConditionFn<F> {
    f: F,
}

impl<F, Fut> ConditionFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, TaskError>> + Send + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps the closure and returns a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Condition for ConditionFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, TaskError>> + Send + 'static,
{
    async fn check(&self) -> Result<bool, TaskError> {
        (self.f)().await
    }
}

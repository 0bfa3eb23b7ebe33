//! # Task body abstraction.
//!
//! This module defines the [`Task`] trait: the body of a recurring task.
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing across the runtime.
//!
//! A body receives a [`CancellationToken`] that is cancelled when the overrun watchdog
//! abandons the run; it should check it to stop cooperatively.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Future returned by [`Task::spawn`]; owned and `'static` so it can run on its own tokio task.
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task body.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use tickvisor::{BoxTaskFuture, Task};
///
/// struct Flush;
///
/// impl Task for Flush {
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Ok(());
///             }
///             // do work...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Creates the future for one run.
    ///
    /// Every call must produce a fresh future; state shared between runs goes behind `Arc`.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}

//! # Overrun watchdog.
//!
//! Runs one task body on its own tokio task and races it against
//! `factor × interval`.
//!
//! ```text
//! spawn(body(child_token)) ──┬── completes first ──► Completed { result, elapsed }
//!                            └── limit first     ──► child_token.cancel()
//!                                                    detach join handle
//!                                                    Terminated { error, elapsed }
//! ```
//!
//! ## Rules
//! - The orphaned body keeps running until it notices cancellation or finishes;
//!   its result is dropped unobserved
//! - A panicking body is reported as [`TaskError::Fail`]
//! - `LongRunning` detection (`elapsed >= interval`) is left to the caller

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::Task;

/// Result of a watched run.
#[derive(Debug)]
pub enum WatchOutcome {
    /// The body finished on its own.
    Completed {
        /// The body's result.
        result: Result<(), TaskError>,
        /// Time from spawn to completion.
        elapsed: Duration,
    },
    /// The limit fired first; carries [`TaskError::Terminated`].
    Terminated {
        /// The termination error.
        error: TaskError,
        /// Time from spawn to termination.
        elapsed: Duration,
    },
}

/// Races task bodies against an overrun limit.
#[derive(Clone, Debug)]
pub struct Watchdog {
    task: String,
    interval: Duration,
    limit: Option<Duration>,
}

impl Watchdog {
    /// Creates a watchdog for `task`; `limit = None` never terminates.
    pub fn new(task: impl Into<String>, interval: Duration, limit: Option<Duration>) -> Self {
        Self {
            task: task.into(),
            interval,
            limit,
        }
    }

    /// Runs one body to completion or termination.
    pub async fn watch<T: Task + ?Sized>(&self, task: &T, parent: &CancellationToken) -> WatchOutcome {
        let child = parent.child_token();
        let started = Instant::now();
        let mut join = tokio::spawn(task.spawn(child.clone()));

        let joined = match self.limit {
            Some(limit) => match time::timeout(limit, &mut join).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    child.cancel();
                    drop(join);
                    return WatchOutcome::Terminated {
                        error: TaskError::Terminated {
                            task: self.task.clone(),
                            interval: self.interval,
                            limit,
                        },
                        elapsed: started.elapsed(),
                    };
                }
            },
            None => join.await,
        };

        let result = match joined {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => Err(TaskError::fail("task panicked")),
            Err(join_err) => Err(TaskError::fail(join_err)),
        };
        WatchOutcome::Completed {
            result,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn sleeper(ms: u64) -> Arc<dyn Task> {
        TaskFn::arc(move |_ctx: CancellationToken| async move {
            time::sleep(Duration::from_millis(ms)).await;
            Ok::<(), TaskError>(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn completes_under_limit() {
        let dog = Watchdog::new("T.run", Duration::from_millis(1000), Some(Duration::from_secs(10)));
        match dog.watch(sleeper(1500).as_ref(), &CancellationToken::new()).await {
            WatchOutcome::Completed { result, elapsed } => {
                assert!(result.is_ok());
                assert!(elapsed >= Duration::from_millis(1500));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_overrun_and_cancels_body() {
        let saw_cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saw_cancel);
        let body = TaskFn::arc(move |ctx: CancellationToken| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::select! {
                    _ = time::sleep(Duration::from_secs(6)) => {}
                    _ = ctx.cancelled() => flag.store(true, Ordering::SeqCst),
                }
                Ok::<(), TaskError>(())
            }
        });

        let dog = Watchdog::new("T.run", Duration::from_millis(500), Some(Duration::from_secs(5)));
        match dog.watch(body.as_ref(), &CancellationToken::new()).await {
            WatchOutcome::Terminated { error, elapsed } => {
                assert!(error.is_termination());
                assert!(elapsed >= Duration::from_secs(5));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        tokio::task::yield_now().await;
        time::sleep(Duration::from_millis(1)).await;
        assert!(saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panic_becomes_failure() {
        let body = TaskFn::arc(|_ctx: CancellationToken| async {
            if true {
                panic!("body exploded");
            }
            Ok::<(), TaskError>(())
        });
        let dog = Watchdog::new("T.run", Duration::from_secs(1), None);
        match dog.watch(body.as_ref(), &CancellationToken::new()).await {
            WatchOutcome::Completed { result, .. } => {
                assert_eq!(result, Err(TaskError::fail("task panicked")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

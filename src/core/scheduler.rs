//! # Fixed-interval scheduling.
//!
//! A [`Schedule`] turns a tick function into a recurring loop. The engine hands it one
//! [`TickFn`] per registered task and a child token that ends the loop.
//!
//! [`IntervalScheduler`] is the default:
//!
//! ```text
//! interval_at(now + interval, interval), MissedTickBehavior::Skip
//!   loop {
//!     select! {
//!       token.cancelled() ─► break
//!       ticker.tick()     ─► inflight.spawn(tick())      (never awaited inline)
//!       inflight.join_next() ─► reap, warn on panic
//!     }
//!   }
//!   drain inflight
//! ```
//!
//! ## Rules
//! - The first tick fires one interval after scheduling
//! - Ticks are spawned, not awaited, so an overlapping tick reaches the guard
//!   and reports `AlreadyRunning` instead of queuing behind the previous run
//! - Missed ticks (runtime stalls) are skipped, never replayed in a burst
//! - The returned handle completes only after every in-flight tick has finished

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One tick of a task, as handed to a [`Schedule`].
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Drives a tick function on a recurring schedule.
pub trait Schedule: Send + Sync + 'static {
    /// Starts calling `tick` every `interval` until `token` is cancelled.
    ///
    /// The handle resolves once the loop has stopped and its in-flight ticks are done.
    fn schedule(
        &self,
        key: &str,
        interval: Duration,
        tick: TickFn,
        token: CancellationToken,
    ) -> JoinHandle<()>;
}

/// Default [`Schedule`] backed by [`tokio::time::interval_at`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalScheduler;

impl IntervalScheduler {
    /// Creates the scheduler.
    pub fn new() -> Self {
        Self
    }
}

impl Schedule for IntervalScheduler {
    fn schedule(
        &self,
        key: &str,
        interval: Duration,
        tick: TickFn,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let key: Arc<str> = Arc::from(key);

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut inflight: JoinSet<()> = JoinSet::new();

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        inflight.spawn(tick());
                    }
                    Some(res) = inflight.join_next(), if !inflight.is_empty() => {
                        reap(&key, res);
                    }
                }
            }

            tracing::debug!(task = %key, inflight = inflight.len(), "schedule stopped");
            while let Some(res) = inflight.join_next().await {
                reap(&key, res);
            }
        })
    }
}

fn reap(key: &str, res: Result<(), tokio::task::JoinError>) {
    if let Err(err) = res {
        if err.is_panic() {
            tracing::warn!(task = %key, "tick panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_tick(count: &Arc<AtomicUsize>, work_ms: u64) -> TickFn {
        let count = Arc::clone(count);
        Arc::new(move || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_millis(work_ms)).await;
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = IntervalScheduler.schedule(
            "Billing.sync",
            Duration::from_secs(1),
            counter_tick(&count, 0),
            token.clone(),
        );

        time::sleep(Duration::from_millis(999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        token.cancel();
        handle.await.expect("schedule loop");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ticks_do_not_delay_the_schedule() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = IntervalScheduler.schedule(
            "Billing.sync",
            Duration::from_secs(1),
            counter_tick(&count, 2500),
            token.clone(),
        );

        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        token.cancel();
        handle.await.expect("schedule loop");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_waits_for_inflight_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = IntervalScheduler.schedule(
            "Billing.sync",
            Duration::from_secs(1),
            counter_tick(&count, 5000),
            token.clone(),
        );

        time::sleep(Duration::from_millis(1100)).await;
        token.cancel();

        let started = Instant::now();
        handle.await.expect("schedule loop");
        assert!(started.elapsed() >= Duration::from_millis(3900));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

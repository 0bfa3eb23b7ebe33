//! # Condition evaluator.
//!
//! Runs a task's conditions concurrently, each under its own timeout, and returns the
//! names of those that did not hold.
//!
//! ```text
//! [(hasWork, c1), (withinQuota, c2), (dependenciesAvailable, c3)]
//!        │               │                       │
//!   timeout(c1)     timeout(c2)             timeout(c3)      (concurrent)
//!        ▼               ▼                       ▼
//!       true           Err/panic/elapsed        false
//!                        │                       │
//!                        └──────► ["withinQuota", "dependenciesAvailable"]
//! ```
//!
//! ## Rules
//! - `Ok(false)`, `Err(_)`, a panic and a timeout all count as failed
//! - The result keeps declaration order
//! - An empty result means the tick may proceed

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::time;

use crate::tasks::ConditionRef;

/// Evaluates named conditions with a per-condition timeout.
#[derive(Clone, Debug)]
pub struct ConditionEvaluator {
    timeout: Option<Duration>,
}

impl ConditionEvaluator {
    /// Creates an evaluator; `None` awaits conditions without a limit.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Returns the names of failed conditions, in declaration order.
    pub async fn evaluate(&self, conditions: &[(Arc<str>, ConditionRef)]) -> Vec<Arc<str>> {
        let checks = conditions.iter().map(|(name, cond)| async move {
            let passed = self.check_one(cond).await;
            (name, passed)
        });

        join_all(checks)
            .await
            .into_iter()
            .filter(|(_, passed)| !passed)
            .map(|(name, _)| Arc::clone(name))
            .collect()
    }

    async fn check_one(&self, cond: &ConditionRef) -> bool {
        let fut = AssertUnwindSafe(cond.check()).catch_unwind();
        let res = match self.timeout {
            Some(dur) => match time::timeout(dur, fut).await {
                Ok(res) => res,
                Err(_elapsed) => return false,
            },
            None => fut.await,
        };
        matches!(res, Ok(Ok(true)))
    }
}

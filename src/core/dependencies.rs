//! # Dependency gate.
//!
//! Tracks which named external dependencies are currently unavailable. The set is fed by
//! an external connectivity watcher through [`DependencyGate::mark_available`] /
//! [`DependencyGate::mark_unavailable`]; every task consults it on each tick.
//!
//! ## Rules
//! - A task's gate is closed iff one of its required dependencies is in the unavailable set
//! - Unknown dependencies are assumed available
//! - The gate reopens on the first tick after the last required dependency comes back;
//!   skipped ticks are never replayed
//! - Only actual state changes publish `DependencyAvailable` / `DependencyUnavailable`

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Condition;

/// Name of the synthetic condition appended to a task's conditions when it declares dependencies.
pub const DEPENDENCIES_AVAILABLE: &str = "dependenciesAvailable";

/// Process-wide (per engine) view of dependency availability.
pub struct DependencyGate {
    unavailable: RwLock<HashSet<Arc<str>>>,
    bus: Bus,
}

impl DependencyGate {
    /// Creates a gate where every dependency is available.
    pub fn new(bus: Bus) -> Self {
        Self {
            unavailable: RwLock::new(HashSet::new()),
            bus,
        }
    }

    /// Marks `name` available. Returns `true` if it was unavailable before.
    pub fn mark_available(&self, name: &str) -> bool {
        let changed = {
            let mut set = self.unavailable.write().unwrap_or_else(PoisonError::into_inner);
            set.remove(name)
        };
        if changed {
            self.bus
                .publish(Event::new(EventKind::DependencyAvailable).with_names([name]));
        }
        changed
    }

    /// Marks `name` unavailable. Returns `true` if it was available before.
    pub fn mark_unavailable(&self, name: &str) -> bool {
        let changed = {
            let mut set = self.unavailable.write().unwrap_or_else(PoisonError::into_inner);
            set.insert(Arc::from(name))
        };
        if changed {
            self.bus
                .publish(Event::new(EventKind::DependencyUnavailable).with_names([name]));
        }
        changed
    }

    /// True unless `name` is currently marked unavailable.
    pub fn is_available(&self, name: &str) -> bool {
        let set = self.unavailable.read().unwrap_or_else(PoisonError::into_inner);
        !set.contains(name)
    }

    /// The subset of `required` that is down, in `required` order.
    pub fn unavailable_among(&self, required: &[Arc<str>]) -> Vec<Arc<str>> {
        let set = self.unavailable.read().unwrap_or_else(PoisonError::into_inner);
        required
            .iter()
            .filter(|name| set.contains(&***name))
            .cloned()
            .collect()
    }

    /// Sorted snapshot of every unavailable dependency.
    pub fn unavailable(&self) -> Vec<String> {
        let set = self.unavailable.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = set.iter().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }
}

/// Synthetic condition: all of a task's required dependencies are up.
pub(crate) struct DependenciesAvailable {
    pub gate: Arc<DependencyGate>,
    pub required: Vec<Arc<str>>,
}

#[async_trait]
impl Condition for DependenciesAvailable {
    async fn check(&self) -> Result<bool, TaskError> {
        Ok(self.gate.unavailable_among(&self.required).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[Arc<str>]) -> Vec<&str> {
        v.iter().map(|n| &**n).collect()
    }

    #[test]
    fn closed_only_for_required_dependencies() {
        let gate = DependencyGate::new(Bus::new(8));
        gate.mark_unavailable("PaymentService");

        let required: Vec<Arc<str>> = vec!["Ledger".into(), "PaymentService".into()];
        assert_eq!(names(&gate.unavailable_among(&required)), ["PaymentService"]);
        assert!(gate.unavailable_among(&[Arc::from("Ledger")]).is_empty());
        assert!(!gate.is_available("PaymentService"));
        assert!(gate.is_available("Ledger"));

        gate.mark_available("PaymentService");
        assert!(gate.unavailable_among(&required).is_empty());
        assert!(gate.is_available("PaymentService"));
    }

    #[tokio::test]
    async fn only_transitions_publish() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let gate = DependencyGate::new(bus);

        assert!(gate.mark_unavailable("PaymentService"));
        assert!(!gate.mark_unavailable("PaymentService"));
        assert!(gate.mark_available("PaymentService"));
        assert!(!gate.mark_available("PaymentService"));

        let first = rx.recv().await.expect("unavailable event");
        assert_eq!(first.kind, EventKind::DependencyUnavailable);
        assert_eq!(&*first.names[0], "PaymentService");
        let second = rx.recv().await.expect("available event");
        assert_eq!(second.kind, EventKind::DependencyAvailable);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn synthetic_condition_follows_gate() {
        let gate = Arc::new(DependencyGate::new(Bus::new(8)));
        let cond = DependenciesAvailable {
            gate: Arc::clone(&gate),
            required: vec!["PaymentService".into()],
        };
        assert_eq!(cond.check().await, Ok(true));
        gate.mark_unavailable("PaymentService");
        assert_eq!(cond.check().await, Ok(false));
        assert_eq!(gate.unavailable(), vec!["PaymentService".to_string()]);
    }
}

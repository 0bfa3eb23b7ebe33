//! # Task keys.
//!
//! A [`TaskKey`] is the stable identity of one recurring task: `"<Type>.<method>"`.
//! The same string is used as the status-registry key and as the event-channel prefix.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Stable, cheaply clonable task identity.
///
/// # Example
/// ```
/// use tickvisor::TaskKey;
///
/// struct Billing;
///
/// assert_eq!(TaskKey::new("Billing", "sync").as_str(), "Billing.sync");
/// assert_eq!(TaskKey::of::<Billing>("sync").as_str(), "Billing.sync");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(Arc<str>);

impl TaskKey {
    /// Builds `"<owner>.<method>"`.
    pub fn new(owner: &str, method: &str) -> Self {
        Self(Arc::from(format!("{owner}.{method}")))
    }

    /// Builds the key from the owning type's short name and a method name.
    pub fn of<T: ?Sized>(method: &str) -> Self {
        Self::new(short_type_name::<T>(), method)
    }

    /// Borrowed string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared string form (for events).
    pub fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

/// Last path segment of `type_name::<T>()`, generics stripped.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskKey {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<TaskKey> for Arc<str> {
    fn from(k: TaskKey) -> Self {
        k.0
    }
}

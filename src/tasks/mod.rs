//! # Task abstractions and definitions.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for the async, cancelable body of a recurring task
//! - [`TaskFn`] - function-backed body
//! - [`Condition`] / [`ConditionFn`] - named async predicates gating a tick
//! - [`TaskKey`] - `"<Type>.<method>"` identity
//! - [`TaskDefinition`] - key, interval, conditions, dependencies, body and hooks

mod condition;
mod definition;
mod key;
mod task;
mod task_fn;

pub use condition::{Condition, ConditionFn, ConditionRef};
pub use definition::{ErrorHook, FinallyHook, TaskDefinition, TaskDefinitionBuilder};
pub use key::TaskKey;
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;

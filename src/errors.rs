//! Typed errors for the bvs core.
//!
//! Only size-limit violations are errors. Cycles, unknown dependencies and
//! failing checks are reported as data so callers decide how to react.

use thiserror::Error;

/// Fatal validation errors raised before any graph work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Too many tasks: {count} exceeds the limit of {limit}")]
    TooManyTasks { count: usize, limit: usize },

    #[error("Task '{task}' has {count} dependencies, exceeding the limit of {limit}")]
    TooManyDependencies {
        task: String,
        count: usize,
        limit: usize,
    },

    #[error("Too many dependencies in total: {count} exceeds the limit of {limit}")]
    TooManyTotalDependencies { count: usize, limit: usize },
}

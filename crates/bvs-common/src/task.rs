//! Task records consumed by the scheduler.

use serde::{Deserialize, Serialize};

/// A unit of agent work with its dependency list.
///
/// Owned by the caller. The scheduler only reads these and fills in
/// `parallel_group` on the copies it returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Unique task id
    pub id: String,
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Ids of tasks that must complete before this one
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Whether the task is already done
    #[serde(default)]
    pub completed: bool,
    /// Execution batch, assigned by the scheduler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<u32>,
}

impl TaskDescriptor {
    /// Create a task with the given dependencies.
    pub fn new(id: &str, title: &str, dependencies: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            dependencies,
            completed: false,
            parallel_group: None,
        }
    }

    /// Mark the task as completed.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

//! Task dependency scheduling.
//!
//! Turns a flat task list into a leveled dependency graph whose groups can be
//! dispatched to parallel workers.
//!
//! ## Architecture
//!
//! 1. **Builder** - enforces size limits and builds forward/reverse edges
//! 2. **Cycle** - three-color DFS that reports one concrete cycle path
//! 3. **Levels** - fixed-point relaxation assigning parallel groups
//! 4. **Scheduler** - validation, ready-set resolution and the schedule report
//!
//! ## Example
//!
//! ```
//! use bvs::dag::TaskScheduler;
//! use bvs_common::TaskDescriptor;
//!
//! let tasks = vec![
//!     TaskDescriptor::new("setup", "Setup", vec![]),
//!     TaskDescriptor::new("api", "API", vec!["setup".to_string()]),
//!     TaskDescriptor::new("ui", "UI", vec!["setup".to_string()]),
//!     TaskDescriptor::new("e2e", "E2E", vec!["api".to_string(), "ui".to_string()]),
//! ];
//!
//! let report = TaskScheduler::new().schedule(&tasks).unwrap();
//! assert_eq!(report.group_count, 3);
//! // Group 0: setup, group 1: api + ui, group 2: e2e
//! assert_eq!(report.group_sizes[&1], 2);
//! ```

mod builder;
mod cycle;
mod levels;
mod scheduler;

pub use builder::{
    DependencyGraph, DependencyNode, GraphBuilder, GraphLimits, MAX_DEPENDENCIES_PER_TASK,
    MAX_TASKS, MAX_TOTAL_DEPENDENCIES, build_graph,
};
pub use scheduler::{ScheduleReport, TaskScheduler, get_ready_tasks, validate_schedule};

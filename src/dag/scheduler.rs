//! Schedule validation, ready-set resolution and the leveled schedule report.

use crate::dag::builder::{DependencyGraph, GraphBuilder, GraphLimits};
use crate::errors::ScheduleError;
use bvs_common::TaskDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// A leveled task schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    /// Input tasks annotated with `parallel_group` (unset when cyclic)
    pub tasks: Vec<TaskDescriptor>,
    pub group_count: usize,
    /// Group number to number of tasks in it
    pub group_sizes: BTreeMap<u32, usize>,
    /// Human-readable validation issues; empty when the schedule is valid
    pub issues: Vec<String>,
}

impl ScheduleReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Task ids per group, in group order.
    pub fn waves(&self) -> Vec<Vec<String>> {
        let mut waves: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for task in &self.tasks {
            if let Some(group) = task.parallel_group {
                waves.entry(group).or_default().push(task.id.clone());
            }
        }
        waves.into_values().collect()
    }
}

/// Scheduler front-end over the graph builder.
#[derive(Debug, Clone, Default)]
pub struct TaskScheduler {
    builder: GraphBuilder,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: GraphLimits) -> Self {
        Self {
            builder: GraphBuilder::new().with_limits(limits),
        }
    }

    /// Build the dependency graph for a task set.
    pub fn build_graph(&self, tasks: &[TaskDescriptor]) -> Result<DependencyGraph, ScheduleError> {
        self.builder.build(tasks)
    }

    /// Validate referential integrity and acyclicity.
    ///
    /// Returns every issue found; an empty list means the schedule is valid.
    /// Size-limit violations are reported as a single issue.
    pub fn validate(&self, tasks: &[TaskDescriptor]) -> Vec<String> {
        let mut issues = reference_issues(tasks);
        match self.builder.build(tasks) {
            Ok(graph) => issues.extend(cycle_issue(&graph)),
            Err(e) => issues.push(e.to_string()),
        }
        issues
    }

    /// Level a task set into parallel groups.
    ///
    /// Size-limit violations abort with an error. Structural problems are
    /// returned in `issues`; on a cycle no task gets a group.
    pub fn schedule(&self, tasks: &[TaskDescriptor]) -> Result<ScheduleReport, ScheduleError> {
        let graph = self.builder.build(tasks)?;

        let mut issues = reference_issues(tasks);
        issues.extend(cycle_issue(&graph));

        let annotated: Vec<TaskDescriptor> = tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                task.parallel_group = graph.group_of(&task.id);
                task
            })
            .collect();

        let group_sizes: BTreeMap<u32, usize> = graph
            .groups()
            .iter()
            .map(|(group, ids)| (*group, ids.len()))
            .collect();

        if !issues.is_empty() {
            warn!(issues = issues.len(), "schedule has validation issues");
        }
        debug!(
            tasks = tasks.len(),
            groups = graph.group_count(),
            "schedule computed"
        );

        Ok(ScheduleReport {
            tasks: annotated,
            group_count: graph.group_count(),
            group_sizes,
            issues,
        })
    }
}

/// Validate a task set with the default limits.
pub fn validate_schedule(tasks: &[TaskDescriptor]) -> Vec<String> {
    TaskScheduler::new().validate(tasks)
}

/// Tasks that are not completed and whose dependencies are all in `completed`.
///
/// Ignores parallel groups entirely.
pub fn get_ready_tasks<'a>(
    tasks: &'a [TaskDescriptor],
    completed: &HashSet<String>,
) -> Vec<&'a TaskDescriptor> {
    tasks
        .iter()
        .filter(|task| !task.completed && !completed.contains(&task.id))
        .filter(|task| task.dependencies.iter().all(|dep| completed.contains(dep)))
        .collect()
}

/// Unknown, self and duplicate references.
fn reference_issues(tasks: &[TaskDescriptor]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            issues.push(format!("Duplicate task id \"{}\"", task.id));
        }
    }

    for task in tasks {
        for dep in &task.dependencies {
            if !seen.contains(dep.as_str()) {
                issues.push(format!(
                    "Task \"{}\" depends on unknown task \"{}\"",
                    task.id, dep
                ));
            }
            if dep == &task.id {
                issues.push(format!("Task \"{}\" depends on itself", task.id));
            }
        }
    }

    issues
}

fn cycle_issue(graph: &DependencyGraph) -> Option<String> {
    graph
        .cycle_path()
        .map(|path| format!("Circular dependency detected: {}", path.join(" -> ")))
}

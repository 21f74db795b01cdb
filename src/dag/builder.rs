//! Dependency graph construction.
//!
//! The builder enforces size limits, creates one node per task with forward
//! (dependencies) and reverse (dependents) edges, runs cycle detection and,
//! for acyclic input, assigns parallel groups.

use crate::dag::cycle::find_cycle;
use crate::dag::levels::{assign_groups, materialize_groups};
use crate::errors::ScheduleError;
use bvs_common::TaskDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Maximum number of tasks in a single graph.
pub const MAX_TASKS: usize = 1000;
/// Maximum number of dependencies a single task may declare.
pub const MAX_DEPENDENCIES_PER_TASK: usize = 50;
/// Maximum number of dependency edges across all tasks.
pub const MAX_TOTAL_DEPENDENCIES: usize = 5000;

/// Size limits enforced before any graph work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLimits {
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    #[serde(default = "default_max_dependencies_per_task")]
    pub max_dependencies_per_task: usize,
    #[serde(default = "default_max_total_dependencies")]
    pub max_total_dependencies: usize,
}

fn default_max_tasks() -> usize {
    MAX_TASKS
}

fn default_max_dependencies_per_task() -> usize {
    MAX_DEPENDENCIES_PER_TASK
}

fn default_max_total_dependencies() -> usize {
    MAX_TOTAL_DEPENDENCIES
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_tasks: MAX_TASKS,
            max_dependencies_per_task: MAX_DEPENDENCIES_PER_TASK,
            max_total_dependencies: MAX_TOTAL_DEPENDENCIES,
        }
    }
}

impl GraphLimits {
    /// Check a task set against the limits.
    pub fn check(&self, tasks: &[TaskDescriptor]) -> Result<(), ScheduleError> {
        if tasks.len() > self.max_tasks {
            return Err(ScheduleError::TooManyTasks {
                count: tasks.len(),
                limit: self.max_tasks,
            });
        }

        let mut total = 0;
        for task in tasks {
            if task.dependencies.len() > self.max_dependencies_per_task {
                return Err(ScheduleError::TooManyDependencies {
                    task: task.id.clone(),
                    count: task.dependencies.len(),
                    limit: self.max_dependencies_per_task,
                });
            }
            total += task.dependencies.len();
        }

        if total > self.max_total_dependencies {
            return Err(ScheduleError::TooManyTotalDependencies {
                count: total,
                limit: self.max_total_dependencies,
            });
        }

        Ok(())
    }
}

/// Per-task working record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub id: String,
    /// Copy of the descriptor's dependency list
    pub dependencies: Vec<String>,
    /// Tasks that list this one as a dependency
    pub dependents: Vec<String>,
    pub parallel_group: u32,
}

impl DependencyNode {
    fn from_task(task: &TaskDescriptor) -> Self {
        Self {
            id: task.id.clone(),
            dependencies: task.dependencies.clone(),
            dependents: Vec::new(),
            parallel_group: 0,
        }
    }
}

/// A task dependency graph, leveled into parallel groups when acyclic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, DependencyNode>,
    /// Task ids in input order
    order: Vec<String>,
    groups: BTreeMap<u32, Vec<String>>,
    has_cycles: bool,
    cycle_path: Option<Vec<String>>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by task id.
    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    /// Task ids in input order.
    pub fn task_ids(&self) -> &[String] {
        &self.order
    }

    pub fn dependents(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependencies(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Assigned group for a task. `None` for unknown ids or cyclic graphs.
    pub fn group_of(&self, id: &str) -> Option<u32> {
        if self.has_cycles {
            return None;
        }
        self.nodes.get(id).map(|n| n.parallel_group)
    }

    /// Group number to task ids, each list in input order.
    ///
    /// Empty when the graph has cycles.
    pub fn groups(&self) -> &BTreeMap<u32, Vec<String>> {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn has_cycles(&self) -> bool {
        self.has_cycles
    }

    /// The first cycle found, with its first id repeated at the end.
    pub fn cycle_path(&self) -> Option<&[String]> {
        self.cycle_path.as_deref()
    }
}

/// Builder for dependency graphs.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    limits: GraphLimits,
}

impl GraphBuilder {
    /// Create a builder with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the size limits.
    pub fn with_limits(mut self, limits: GraphLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the graph for a task set.
    ///
    /// Dependencies on unknown ids are kept on the node but produce no
    /// reverse edge; reporting them is the validator's job.
    pub fn build(&self, tasks: &[TaskDescriptor]) -> Result<DependencyGraph, ScheduleError> {
        self.limits.check(tasks)?;

        let mut nodes: HashMap<String, DependencyNode> = HashMap::with_capacity(tasks.len());
        let mut order = Vec::with_capacity(tasks.len());
        for task in tasks {
            if nodes.contains_key(&task.id) {
                debug!(task = %task.id, "ignoring duplicate task id");
                continue;
            }
            nodes.insert(task.id.clone(), DependencyNode::from_task(task));
            order.push(task.id.clone());
        }

        let edges: Vec<(String, String)> = order
            .iter()
            .filter_map(|id| nodes.get(id))
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .map(move |dep| (dep.clone(), node.id.clone()))
            })
            .collect();
        for (dependency, dependent) in edges {
            if let Some(node) = nodes.get_mut(&dependency) {
                node.dependents.push(dependent);
            }
        }

        let mut graph = DependencyGraph {
            nodes,
            order,
            ..Default::default()
        };

        if let Some(path) = find_cycle(&graph.nodes, &graph.order) {
            debug!(cycle = %path.join(" -> "), "dependency cycle detected");
            graph.has_cycles = true;
            graph.cycle_path = Some(path);
            return Ok(graph);
        }

        let passes = assign_groups(&mut graph.nodes, &graph.order);
        graph.groups = materialize_groups(&graph.nodes, &graph.order);
        debug!(
            tasks = graph.len(),
            groups = graph.group_count(),
            passes,
            "dependency graph leveled"
        );

        Ok(graph)
    }
}

/// Build a graph with the default limits.
pub fn build_graph(tasks: &[TaskDescriptor]) -> Result<DependencyGraph, ScheduleError> {
    GraphBuilder::new().build(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: Vec<&str>) -> TaskDescriptor {
        TaskDescriptor::new(
            id,
            &format!("Task {}", id),
            deps.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_build_populates_dependents() {
        let tasks = vec![
            task("a", vec![]),
            task("b", vec!["a"]),
            task("c", vec!["a"]),
            task("d", vec!["b", "c"]),
        ];

        let graph = build_graph(&tasks).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependents("a"), &["b".to_string(), "c".to_string()]);
        assert_eq!(graph.dependents("b"), &["d".to_string()]);
        assert!(graph.dependents("d").is_empty());
        assert_eq!(graph.dependencies("d"), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_node_keys_match_input_ids() {
        let tasks = vec![task("x", vec![]), task("y", vec!["x"])];
        let graph = build_graph(&tasks).unwrap();
        assert_eq!(graph.task_ids(), &["x".to_string(), "y".to_string()]);
        assert!(graph.node("x").is_some());
        assert!(graph.node("z").is_none());
    }

    #[test]
    fn test_unknown_dependency_is_skipped_for_reverse_edges() {
        let tasks = vec![task("a", vec!["ghost"])];
        let graph = build_graph(&tasks).unwrap();

        assert!(!graph.has_cycles());
        assert_eq!(graph.dependencies("a"), &["ghost".to_string()]);
        assert_eq!(graph.group_of("a"), Some(0));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let tasks = vec![task("a", vec![]), task("b", vec!["a"]), task("a", vec!["b"])];
        let graph = build_graph(&tasks).unwrap();

        assert_eq!(graph.len(), 2);
        assert!(!graph.has_cycles());
        assert!(graph.dependencies("a").is_empty());
    }

    #[test]
    fn test_too_many_tasks() {
        let tasks: Vec<_> = (0..=MAX_TASKS)
            .map(|i| task(&format!("t{}", i), vec![]))
            .collect();
        let err = build_graph(&tasks).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::TooManyTasks {
                count: MAX_TASKS + 1,
                limit: MAX_TASKS
            }
        );
    }

    #[test]
    fn test_max_tasks_is_accepted() {
        let tasks: Vec<_> = (0..MAX_TASKS)
            .map(|i| task(&format!("t{}", i), vec![]))
            .collect();
        assert!(build_graph(&tasks).is_ok());
    }

    #[test]
    fn test_too_many_dependencies_per_task() {
        let deps: Vec<String> = (0..=MAX_DEPENDENCIES_PER_TASK)
            .map(|i| format!("d{}", i))
            .collect();
        let tasks = vec![TaskDescriptor::new("big", "Big", deps)];

        let err = build_graph(&tasks).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::TooManyDependencies { ref task, count, .. }
                if task == "big" && count == MAX_DEPENDENCIES_PER_TASK + 1
        ));
    }

    #[test]
    fn test_too_many_total_dependencies() {
        let limits = GraphLimits {
            max_tasks: 10,
            max_dependencies_per_task: 5,
            max_total_dependencies: 3,
        };
        let tasks = vec![
            task("a", vec![]),
            task("b", vec!["a"]),
            task("c", vec!["a", "b"]),
            task("d", vec!["c"]),
        ];

        let err = GraphBuilder::new().with_limits(limits).build(&tasks).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::TooManyTotalDependencies { count: 4, limit: 3 }
        );
    }

    #[test]
    fn test_cyclic_graph_has_no_groups() {
        let tasks = vec![task("a", vec!["b"]), task("b", vec!["a"])];
        let graph = build_graph(&tasks).unwrap();

        assert!(graph.has_cycles());
        assert!(graph.groups().is_empty());
        assert_eq!(graph.group_of("a"), None);
        assert!(graph.cycle_path().is_some());
    }

    #[test]
    fn test_empty_graph() {
        let graph = build_graph(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(!graph.has_cycles());
        assert_eq!(graph.group_count(), 0);
    }
}

//! Property tests for task leveling and ready-set resolution.

use bvs::dag::{TaskScheduler, build_graph, get_ready_tasks, validate_schedule};
use bvs_common::TaskDescriptor;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

fn task_id(i: usize) -> String {
    format!("task_{}", i)
}

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn acyclic_tasks(max_tasks: usize) -> impl Strategy<Value = Vec<TaskDescriptor>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let deps: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    TaskDescriptor::new(
                        &task_id(i),
                        &format!("Task {}", i),
                        deps.into_iter().map(task_id).collect(),
                    )
                })
                .collect()
        })
    })
}

// An acyclic set plus one back edge from the first task to the last.
fn cyclic_tasks(max_tasks: usize) -> impl Strategy<Value = Vec<TaskDescriptor>> {
    acyclic_tasks(max_tasks)
        .prop_filter("needs a path from last to first", |tasks| tasks.len() >= 2)
        .prop_map(|mut tasks| {
            let n = tasks.len();
            // Force a chain edge so the back edge closes a cycle
            for i in 1..n {
                let prev = task_id(i - 1);
                if !tasks[i].dependencies.contains(&prev) {
                    tasks[i].dependencies.push(prev);
                }
            }
            tasks[0].dependencies.push(task_id(n - 1));
            tasks
        })
}

proptest! {
    #[test]
    fn prop_group_is_one_more_than_deepest_dependency(tasks in acyclic_tasks(30)) {
        let graph = build_graph(&tasks).unwrap();
        prop_assert!(!graph.has_cycles());

        for task in &tasks {
            let group = graph.group_of(&task.id).unwrap();
            let expected = task
                .dependencies
                .iter()
                .map(|dep| graph.group_of(dep).unwrap() + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(group, expected);
        }
    }

    #[test]
    fn prop_groups_partition_tasks_contiguously(tasks in acyclic_tasks(30)) {
        let graph = build_graph(&tasks).unwrap();

        let mut seen = HashSet::new();
        for ids in graph.groups().values() {
            for id in ids {
                prop_assert!(seen.insert(id.clone()), "task {} in two groups", id);
            }
        }
        prop_assert_eq!(seen.len(), tasks.len());

        let numbers: Vec<u32> = graph.groups().keys().copied().collect();
        let contiguous: Vec<u32> = (0..numbers.len() as u32).collect();
        prop_assert_eq!(numbers, contiguous);
    }

    #[test]
    fn prop_build_is_idempotent(tasks in acyclic_tasks(30)) {
        let first = build_graph(&tasks).unwrap();
        let second = build_graph(&tasks).unwrap();
        prop_assert_eq!(first.groups(), second.groups());

        let report = TaskScheduler::new().schedule(&tasks).unwrap();
        for task in &report.tasks {
            prop_assert_eq!(task.parallel_group, first.group_of(&task.id));
        }
    }

    #[test]
    fn prop_cycle_path_is_closed(tasks in cyclic_tasks(20)) {
        let graph = build_graph(&tasks).unwrap();
        prop_assert!(graph.has_cycles());

        let path = graph.cycle_path().unwrap();
        prop_assert!(path.len() >= 2);
        prop_assert_eq!(path.first(), path.last());
        prop_assert!(graph.groups().is_empty());

        let issues = validate_schedule(&tasks);
        prop_assert!(issues.iter().any(|i| i.contains("Circular dependency")));
    }

    #[test]
    fn prop_ready_set_is_exact(
        tasks in acyclic_tasks(25),
        completed_mask in proptest::collection::vec(any::<bool>(), 25),
    ) {
        let completed: HashSet<String> = tasks
            .iter()
            .zip(completed_mask.iter())
            .filter(|(_, done)| **done)
            .map(|(task, _)| task.id.clone())
            .collect();

        let ready: HashSet<&str> = get_ready_tasks(&tasks, &completed)
            .into_iter()
            .map(|task| task.id.as_str())
            .collect();

        for task in &tasks {
            let expected = !completed.contains(&task.id)
                && task.dependencies.iter().all(|dep| completed.contains(dep));
            prop_assert_eq!(ready.contains(task.id.as_str()), expected, "task {}", task.id);
        }
    }
}

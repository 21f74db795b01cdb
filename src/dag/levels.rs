//! Parallel group assignment for acyclic graphs.

use crate::dag::builder::DependencyNode;
use std::collections::{BTreeMap, HashMap};

/// Level every node so its group is one more than the highest group among
/// its dependencies. Nodes without dependencies stay in group 0.
///
/// Uses repeated relaxation passes in `order` until nothing changes, capped
/// at `node count + 1` passes so an accidentally cyclic graph still
/// terminates. Returns the number of passes run.
pub fn assign_groups(nodes: &mut HashMap<String, DependencyNode>, order: &[String]) -> usize {
    for node in nodes.values_mut() {
        node.parallel_group = 0;
    }

    let max_passes = nodes.len() + 1;
    for pass in 1..=max_passes {
        let mut changed = false;

        for id in order {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            if node.dependencies.is_empty() {
                continue;
            }

            // Unknown ids contribute nothing
            let candidate = node
                .dependencies
                .iter()
                .filter_map(|dep| nodes.get(dep))
                .map(|dep| dep.parallel_group + 1)
                .max()
                .unwrap_or(0);

            if let Some(node) = nodes.get_mut(id)
                && node.parallel_group != candidate
            {
                node.parallel_group = candidate;
                changed = true;
            }
        }

        if !changed {
            return pass;
        }
    }

    max_passes
}

/// Collect task ids by group, each group in input order.
pub fn materialize_groups(
    nodes: &HashMap<String, DependencyNode>,
    order: &[String],
) -> BTreeMap<u32, Vec<String>> {
    let mut groups: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for id in order {
        if let Some(node) = nodes.get(id) {
            groups
                .entry(node.parallel_group)
                .or_default()
                .push(id.clone());
        }
    }
    groups
}

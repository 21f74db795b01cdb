//! Cycle detection over the dependency graph.
//!
//! Three-color depth-first search with an explicit stack, so deep chains at
//! the task ceiling never touch the call stack. Every node is tried as a root
//! so cycles in disconnected components are found.

use crate::dag::builder::DependencyNode;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet
    White,
    /// On the current DFS path
    Gray,
    /// Fully explored
    Black,
}

/// Find the first dependency cycle, walking roots in `order`.
///
/// The returned path is in execution order (each id is a dependency of the
/// next one) and repeats its first id at the end. Which cycle is reported
/// depends on input order when several exist.
pub fn find_cycle(nodes: &HashMap<String, DependencyNode>, order: &[String]) -> Option<Vec<String>> {
    let mut colors: HashMap<&str, Color> = order
        .iter()
        .map(|id| (id.as_str(), Color::White))
        .collect();

    for root in order {
        if colors.get(root.as_str()) != Some(&Color::White) {
            continue;
        }
        if let Some(cycle) = walk_from(nodes, root, &mut colors) {
            return Some(cycle);
        }
    }

    None
}

fn walk_from<'a>(
    nodes: &'a HashMap<String, DependencyNode>,
    root: &'a str,
    colors: &mut HashMap<&'a str, Color>,
) -> Option<Vec<String>> {
    // (node id, index of the next dependency to follow)
    let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
    let mut path: Vec<&'a str> = vec![root];
    colors.insert(root, Color::Gray);

    while let Some(frame) = stack.last_mut() {
        let (id, next) = *frame;
        let deps = nodes
            .get(id)
            .map(|n| n.dependencies.as_slice())
            .unwrap_or(&[]);

        if next >= deps.len() {
            colors.insert(id, Color::Black);
            path.pop();
            stack.pop();
            continue;
        }

        frame.1 += 1;
        let dep = deps[next].as_str();
        match colors.get(dep).copied() {
            // Unknown id: not part of the graph
            None | Some(Color::Black) => {}
            Some(Color::Gray) => return Some(close_cycle(&path, dep)),
            Some(Color::White) => {
                colors.insert(dep, Color::Gray);
                path.push(dep);
                stack.push((dep, 0));
            }
        }
    }

    None
}

/// Cut the cycle out of the DFS path and flip it into execution order.
///
/// `path` runs along dependency edges and ends at the node whose dependency
/// `dep` is already on the path.
fn close_cycle(path: &[&str], dep: &str) -> Vec<String> {
    let start = path.iter().position(|id| *id == dep).unwrap_or(0);
    let mut cycle = Vec::with_capacity(path.len() - start + 1);
    cycle.push(dep.to_string());
    cycle.extend(path[start + 1..].iter().rev().map(|id| id.to_string()));
    cycle.push(dep.to_string());
    cycle
}

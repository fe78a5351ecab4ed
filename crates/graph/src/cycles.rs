// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Cycle detection over the `requires` subgraph.

use indexmap::IndexMap;
use maestro_core::{Dependency, TaskId};

/// Adjacency over hard edges, preserving input order for determinism.
pub(crate) fn hard_adjacency<'a>(
    task_ids: impl Iterator<Item = &'a TaskId>,
    deps: &'a [Dependency],
) -> IndexMap<&'a TaskId, Vec<&'a TaskId>> {
    let mut adj: IndexMap<&TaskId, Vec<&TaskId>> = task_ids.map(|id| (id, Vec::new())).collect();
    for dep in deps.iter().filter(|d| d.is_hard()) {
        if let Some(next) = adj.get_mut(&dep.from) {
            next.push(&dep.to);
        }
    }
    adj
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find cycles by iterative DFS.
///
/// Entering a node already on the current path yields a cycle; each cycle is
/// reported once, closed (first ID repeated at the end). Unknown edge
/// endpoints are ignored here; the validator reports them as errors.
pub fn find_cycles(task_ids: &[TaskId], deps: &[Dependency]) -> Vec<Vec<TaskId>> {
    let adj = hard_adjacency(task_ids.iter(), deps);
    let mut color: IndexMap<&TaskId, Color> =
        adj.keys().map(|id| (*id, Color::White)).collect();
    let mut cycles = Vec::new();

    for &root in adj.keys() {
        if color[root] != Color::White {
            continue;
        }
        // stack of (node, next child index); path mirrors the gray chain
        let mut stack: Vec<(&TaskId, usize)> = vec![(root, 0)];
        let mut path: Vec<&TaskId> = vec![root];
        color.insert(root, Color::Gray);

        while let Some((node, child_idx)) = stack.last_mut() {
            let children = &adj[*node];
            if let Some(&next) = children.get(*child_idx) {
                *child_idx += 1;
                match color.get(next).copied() {
                    Some(Color::White) => {
                        color.insert(next, Color::Gray);
                        path.push(next);
                        stack.push((next, 0));
                    }
                    Some(Color::Gray) => {
                        if let Some(start) = path.iter().position(|&id| id == next) {
                            let mut cycle: Vec<TaskId> =
                                path[start..].iter().map(|&id| id.clone()).collect();
                            cycle.push(next.clone());
                            cycles.push(cycle);
                        }
                    }
                    _ => {}
                }
            } else {
                color.insert(*node, Color::Black);
                path.pop();
                stack.pop();
            }
        }
    }
    cycles
}

/// Would adding `from -> to` close a cycle?
///
/// Bounded DFS from `to` looking for `from` over hard edges. Returns the
/// witness path `[to, ..., from]` when one exists.
pub fn would_create_cycle(
    deps: &[Dependency],
    from: &TaskId,
    to: &TaskId,
) -> Option<Vec<TaskId>> {
    if from == to {
        return Some(vec![to.clone(), from.clone()]);
    }
    // adjacency restricted to nodes reachable in the edge list
    let mut adj: IndexMap<&TaskId, Vec<&TaskId>> = IndexMap::new();
    for dep in deps.iter().filter(|d| d.is_hard()) {
        adj.entry(&dep.from).or_default().push(&dep.to);
        adj.entry(&dep.to).or_default();
    }

    let mut visited: IndexMap<&TaskId, bool> = IndexMap::new();
    let mut parent: IndexMap<&TaskId, &TaskId> = IndexMap::new();
    let mut stack = vec![to];
    visited.insert(to, true);

    while let Some(node) = stack.pop() {
        if node == from {
            let mut path = vec![node.clone()];
            let mut current = node;
            while let Some(&prev) = parent.get(current) {
                path.push(prev.clone());
                current = prev;
            }
            path.reverse();
            return Some(path);
        }
        if let Some(children) = adj.get(node) {
            for &next in children {
                if !visited.get(next).copied().unwrap_or(false) {
                    visited.insert(next, true);
                    parent.insert(next, node);
                    stack.push(next);
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "cycles_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Topological ordering via Kahn's algorithm.

use std::collections::BinaryHeap;

use indexmap::IndexMap;
use maestro_core::{Task, TaskId, TaskPriority};

use crate::cycles::hard_adjacency;

/// Heap key for ready tasks.
///
/// `Ord` is arranged so the max-heap pops the highest priority first, then
/// the earliest `created_at`, then the smallest task ID: the deterministic
/// tie-break contract.
#[derive(Debug, PartialEq, Eq)]
struct ReadyKey {
    priority: TaskPriority,
    created_at: u64,
    task_id: TaskId,
}

impl Ord for ReadyKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

impl PartialOrd for ReadyKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Produce a full execution order over hard edges.
///
/// Returns `None` when the graph contains a cycle (fewer than |V| tasks get
/// extracted). Edges referencing unknown tasks are ignored; the validator
/// reports them separately.
pub fn execution_order(
    tasks: &[Task],
    deps: &[maestro_core::Dependency],
) -> Option<Vec<TaskId>> {
    let by_id: IndexMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.task_id, t)).collect();
    let adj = hard_adjacency(by_id.keys().copied(), deps);

    let mut in_degree: IndexMap<&TaskId, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    for (_, children) in adj.iter() {
        for &child in children {
            if let Some(count) = in_degree.get_mut(child) {
                *count += 1;
            }
        }
    }

    let mut heap: BinaryHeap<ReadyKey> = in_degree
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&id, _)| ready_key(&by_id, id))
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(key) = heap.pop() {
        order.push(key.task_id.clone());
        if let Some(children) = adj.get(&key.task_id) {
            for &child in children {
                if let Some(count) = in_degree.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        heap.push(ready_key(&by_id, child));
                    }
                }
            }
        }
    }

    (order.len() == tasks.len()).then_some(order)
}

fn ready_key(by_id: &IndexMap<&TaskId, &Task>, id: &TaskId) -> ReadyKey {
    let task = by_id[id];
    ReadyKey { priority: task.priority, created_at: task.created_at, task_id: id.clone() }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;

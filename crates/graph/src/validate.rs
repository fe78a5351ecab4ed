// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Full validation pass over a task set and its dependency edges.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use maestro_core::config::GraphConfig;
use maestro_core::{Dependency, Task, TaskId, TaskPriority};

use crate::cycles::{find_cycles, hard_adjacency};
use crate::order::execution_order;
use crate::report::{
    CircularDependency, CycleSeverity, ValidationError, ValidationReport, ValidationSuggestion,
    ValidationWarning,
};

/// Validate tasks plus dependencies, producing the structured report.
///
/// Deterministic for equal inputs; every pass is linear in |V| + |E| (the
/// shared-file scan is linear in total path count).
pub fn validate_dependencies(
    tasks: &[Task],
    deps: &[Dependency],
    config: &GraphConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let by_id: IndexMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.task_id, t)).collect();

    collect_errors(&by_id, deps, &mut report.errors);

    let task_ids: Vec<TaskId> = tasks.iter().map(|t| t.task_id.clone()).collect();
    for cycle in find_cycles(&task_ids, deps) {
        report.circular_dependencies.push(describe_cycle(cycle, &by_id, deps));
    }

    collect_warnings(&by_id, deps, config, &mut report.warnings);
    collect_suggestions(&by_id, deps, &mut report.suggestions);

    if report.circular_dependencies.is_empty() {
        if let Some(order) = execution_order(tasks, deps) {
            report.execution_order = order;
        }
    }
    report
}

fn collect_errors(
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
    errors: &mut Vec<ValidationError>,
) {
    for dep in deps {
        if dep.from == dep.to {
            errors.push(ValidationError::SelfDependency { task_id: dep.from.clone() });
            continue;
        }
        if !by_id.contains_key(&dep.from) {
            errors.push(ValidationError::MissingTask {
                task_id: dep.from.clone(),
                referenced_by: dep.to.clone(),
            });
        }
        if !by_id.contains_key(&dep.to) {
            errors.push(ValidationError::MissingTask {
                task_id: dep.to.clone(),
                referenced_by: dep.from.clone(),
            });
        }
    }
}

fn describe_cycle(
    cycle: Vec<TaskId>,
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
) -> CircularDependency {
    // last element repeats the first
    let members = &cycle[..cycle.len().saturating_sub(1)];
    let severity = cycle_severity(members, by_id);
    let resolution_options = resolution_options(members, by_id, deps);
    CircularDependency { cycle, severity, resolution_options }
}

fn cycle_severity(members: &[TaskId], by_id: &IndexMap<&TaskId, &Task>) -> CycleSeverity {
    let priority_of = |id: &TaskId| by_id.get(id).map(|t| t.priority);
    if members.iter().any(|id| priority_of(id) == Some(TaskPriority::Critical)) {
        return CycleSeverity::Critical;
    }
    if members.len() > 4 || members.iter().any(|id| priority_of(id) == Some(TaskPriority::High)) {
        return CycleSeverity::High;
    }
    CycleSeverity::Medium
}

fn resolution_options(
    members: &[TaskId],
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
) -> Vec<String> {
    let member_set: IndexSet<&TaskId> = members.iter().collect();
    let mut options = Vec::with_capacity(3);

    // Weakest edge first: a soft edge between members if one exists,
    // otherwise the edge entering the lowest-priority member.
    let soft = deps.iter().find(|d| {
        !d.is_hard() && member_set.contains(&d.from) && member_set.contains(&d.to)
    });
    match soft {
        Some(dep) => options.push(format!(
            "remove the optional dependency {} -> {} (suggests)",
            dep.from, dep.to
        )),
        None => {
            let weakest = members
                .iter()
                .min_by_key(|id| by_id.get(*id).map(|t| t.priority).unwrap_or(TaskPriority::Low));
            if let Some(&to) = weakest.as_ref() {
                if let Some(dep) = deps
                    .iter()
                    .find(|d| d.is_hard() && d.to == *to && member_set.contains(&d.from))
                {
                    options.push(format!(
                        "remove the dependency {} -> {} to break the loop",
                        dep.from, dep.to
                    ));
                }
            }
        }
    }

    let chain = members.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ");
    options.push(format!("reorder the cycle members into a linear chain: {chain}"));

    // Splitting the busiest member gives the loop somewhere to break.
    let busiest = members.iter().max_by_key(|id| {
        deps.iter().filter(|d| d.from == **id || d.to == **id).count()
    });
    if let Some(id) = busiest {
        options.push(format!("split {id} into smaller tasks and re-point the edges"));
    }
    options
}

fn collect_warnings(
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
    config: &GraphConfig,
    warnings: &mut Vec<ValidationWarning>,
) {
    for dep in deps.iter().filter(|d| d.is_hard()) {
        let (Some(from), Some(to)) = (by_id.get(&dep.from), by_id.get(&dep.to)) else {
            continue;
        };
        if from.priority < to.priority {
            warnings.push(ValidationWarning::PriorityInversion {
                from: dep.from.clone(),
                to: dep.to.clone(),
            });
        }
        if from.task_type > to.task_type {
            warnings.push(ValidationWarning::TypeOrderViolation {
                from: dep.from.clone(),
                to: dep.to.clone(),
            });
        }
        if let (Some(from_epic), Some(to_epic)) = (&from.epic_id, &to.epic_id) {
            if from_epic != to_epic {
                warnings.push(ValidationWarning::CrossEpicDependency {
                    from: dep.from.clone(),
                    to: dep.to.clone(),
                });
            }
        }
    }

    if let Some((depth, deepest)) = longest_chain(by_id, deps) {
        if depth > config.max_dependency_depth {
            warnings.push(ValidationWarning::ChainTooDeep {
                depth,
                max: config.max_dependency_depth,
                task_id: deepest.clone(),
            });
        }
        let length = depth + 1;
        if length > config.max_chain_length {
            warnings.push(ValidationWarning::ChainTooLong {
                length,
                max: config.max_chain_length,
                task_id: deepest,
            });
        }
    }
}

/// Longest prerequisite chain (in edges) and the task it ends at.
///
/// Only meaningful on acyclic graphs; bails out (returns `None`) when a
/// cycle prevents a full topological pass.
fn longest_chain(
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
) -> Option<(usize, TaskId)> {
    let adj = hard_adjacency(by_id.keys().copied(), deps);
    let mut in_degree: IndexMap<&TaskId, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    for (_, children) in adj.iter() {
        for &child in children {
            if let Some(count) = in_degree.get_mut(child) {
                *count += 1;
            }
        }
    }

    let mut queue: Vec<&TaskId> =
        in_degree.iter().filter(|(_, &c)| c == 0).map(|(&id, _)| id).collect();
    let mut depth: IndexMap<&TaskId, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    let mut seen = 0usize;
    let mut head = 0usize;
    while head < queue.len() {
        let node = queue[head];
        head += 1;
        seen += 1;
        let node_depth = depth[node];
        if let Some(children) = adj.get(node) {
            for &child in children {
                if let Some(d) = depth.get_mut(child) {
                    *d = (*d).max(node_depth + 1);
                }
                if let Some(count) = in_degree.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(child);
                    }
                }
            }
        }
    }
    if seen != by_id.len() {
        return None;
    }
    depth
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(&id, &d)| (d, id.clone()))
}

fn collect_suggestions(
    by_id: &IndexMap<&TaskId, &Task>,
    deps: &[Dependency],
    suggestions: &mut Vec<ValidationSuggestion>,
) {
    for dep in deps.iter().filter(|d| d.is_hard()) {
        let (Some(from), Some(to)) = (by_id.get(&dep.from), by_id.get(&dep.to)) else {
            continue;
        };
        if to.estimated_hours > 0.0 && from.estimated_hours > 3.0 * to.estimated_hours {
            suggestions.push(ValidationSuggestion::LargeTaskBlocksSmall {
                from: dep.from.clone(),
                to: dep.to.clone(),
            });
        }
        let gap = from.priority.level().abs_diff(to.priority.level());
        if gap > 1 {
            suggestions.push(ValidationSuggestion::PriorityGap {
                from: dep.from.clone(),
                to: dep.to.clone(),
                gap,
            });
        }
    }

    // Unordered tasks touching the same files: group by path, flag
    // consecutive pairs within each group.
    let has_edge = |a: &TaskId, b: &TaskId| {
        deps.iter().any(|d| (d.from == *a && d.to == *b) || (d.from == *b && d.to == *a))
    };
    let mut by_path: IndexMap<&str, Vec<&Task>> = IndexMap::new();
    for &task in by_id.values() {
        for path in &task.file_paths {
            by_path.entry(path.as_str()).or_default().push(task);
        }
    }
    let mut flagged: IndexSet<(&TaskId, &TaskId)> = IndexSet::new();
    for (_, group) in by_path.iter() {
        for pair in group.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if has_edge(&a.task_id, &b.task_id) || !flagged.insert((&a.task_id, &b.task_id)) {
                continue;
            }
            let shared: Vec<String> = a
                .file_paths
                .iter()
                .filter(|p| b.file_paths.contains(p))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            suggestions.push(ValidationSuggestion::SharedFilePaths {
                a: a.task_id.clone(),
                b: b.task_id.clone(),
                paths: shared,
            });
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;

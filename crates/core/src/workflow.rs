// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Workflow record: a correlated set of tasks, one per user request.

use std::collections::BTreeSet;

use crate::dependency::Dependency;
use crate::error::{Error, ErrorContext, ErrorKind};
use crate::id::{SessionId, TaskId, WorkflowId};
use crate::task::{Task, TaskStatus, TransitionRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Orchestration phase the workflow is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Decomposition,
    Orchestration,
    Execution,
    Monitoring,
    Cleanup,
}

crate::simple_display! {
    WorkflowPhase {
        Decomposition => "decomposition",
        Orchestration => "orchestration",
        Execution => "execution",
        Monitoring => "monitoring",
        Cleanup => "cleanup",
    }
}

/// Workflow lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initializing,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

crate::simple_display! {
    WorkflowStatus {
        Initializing => "initializing",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// A correlated set of tasks with their dependency edges and history.
///
/// Task insertion order is preserved and observable (it is the submission
/// order used for scheduling tie-breaks), hence the `IndexMap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub session_id: SessionId,
    pub phase: WorkflowPhase,
    pub status: WorkflowStatus,
    pub start_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    pub tasks: IndexMap<TaskId, Task>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Append-only transition history, oldest first, bounded by config.
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
}

impl Workflow {
    pub fn new(workflow_id: WorkflowId, session_id: SessionId, now_ms: u64) -> Self {
        Self {
            workflow_id,
            session_id,
            phase: WorkflowPhase::Decomposition,
            status: WorkflowStatus::Initializing,
            start_time: now_ms,
            end_time: None,
            tasks: IndexMap::new(),
            dependencies: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Check the structural invariant: every dependency endpoint exists.
    pub fn check_dependency_endpoints(&self) -> Result<(), Error> {
        for dep in &self.dependencies {
            for endpoint in [&dep.from, &dep.to] {
                if !self.tasks.contains_key(endpoint.as_str()) {
                    return Err(Error::new(
                        ErrorKind::Validation,
                        format!("dependency references unknown task {endpoint}"),
                    )
                    .with_context(
                        ErrorContext::new("workflow", "check_dependency_endpoints")
                            .entity(self.workflow_id.as_str()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Hard prerequisites per task: `to -> {from...}` over `requires` edges.
    pub fn prerequisites(&self) -> IndexMap<TaskId, BTreeSet<TaskId>> {
        let mut map: IndexMap<TaskId, BTreeSet<TaskId>> =
            self.tasks.keys().map(|id| (id.clone(), BTreeSet::new())).collect();
        for dep in self.dependencies.iter().filter(|d| d.is_hard()) {
            if let Some(set) = map.get_mut(dep.to.as_str()) {
                set.insert(dep.from.clone());
            }
        }
        map
    }

    /// A pending task whose hard prerequisites are all completed.
    pub fn is_ready(&self, task_id: &TaskId) -> bool {
        let Some(task) = self.tasks.get(task_id.as_str()) else {
            return false;
        };
        if task.status != TaskStatus::Pending {
            return false;
        }
        self.dependencies
            .iter()
            .filter(|d| d.is_hard() && &d.to == task_id)
            .all(|d| {
                self.tasks
                    .get(d.from.as_str())
                    .is_some_and(|t| t.status == TaskStatus::Completed)
            })
    }

    /// All ready tasks in submission order.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        self.tasks.keys().filter(|id| self.is_ready(id)).cloned().collect()
    }

    /// Tasks transitively dependent on `root` via hard edges.
    pub fn dependents_of(&self, root: &TaskId) -> BTreeSet<TaskId> {
        let mut out = BTreeSet::new();
        let mut stack = vec![root.clone()];
        while let Some(current) = stack.pop() {
            for dep in self.dependencies.iter().filter(|d| d.is_hard() && d.from == current) {
                if out.insert(dep.to.clone()) {
                    stack.push(dep.to.clone());
                }
            }
        }
        out
    }

    /// True when every task reached a terminal status.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    /// Record a transition, trimming the oldest entries past `max_history`.
    pub fn record_transition(&mut self, record: TransitionRecord, max_history: usize) {
        self.history.push(record);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;

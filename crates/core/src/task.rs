// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Task record, classification enums, and the legal-transition table.
//!
//! The transition table here is the single authority for task state changes;
//! every mutation in the coordinator goes through [`TaskStatus::can_become`].

use std::collections::BTreeSet;

use crate::id::{AgentId, EpicId, ProjectId, TaskId, WorkflowId};
use serde::{Deserialize, Serialize};

/// Task classification, ordered by pipeline stage.
///
/// The derived `Ord` is the canonical stage ordering used by the dependency
/// validator: a dependency from a later stage to an earlier one is suspect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Research,
    Development,
    Testing,
    Review,
    Deployment,
    Documentation,
}

crate::simple_display! {
    TaskType {
        Research => "research",
        Development => "development",
        Testing => "testing",
        Review => "review",
        Deployment => "deployment",
        Documentation => "documentation",
    }
}

/// Scheduling priority, ordered ascending so `Critical` compares greatest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Numeric level for gap calculations (low = 0 .. critical = 3).
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

crate::simple_display! {
    TaskPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Blocked => "blocked",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// Legal transitions out of this status.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        use TaskStatus::*;
        match self {
            Pending => &[InProgress, Cancelled, Blocked],
            InProgress => &[Completed, Failed, Blocked, Cancelled],
            Blocked => &[InProgress, Cancelled, Failed],
            Completed => &[Cancelled],
            Failed => &[Pending, Cancelled],
            Cancelled => &[Pending],
        }
    }

    /// Whether the transition `self -> to` is in the legal table.
    pub fn can_become(&self, to: TaskStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// One accepted state transition, appended to the workflow history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub timestamp: u64,
    pub reason: String,
    /// Who caused the change: an agent ID, session ID, or internal component.
    pub triggered_by: String,
    pub is_automated: bool,
}

/// The atomic scheduling unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub workflow_id: WorkflowId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<EpicId>,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_hours: f64,
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    pub created_at: u64,
    /// Agent currently executing this task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<AgentId>,
    /// Fields callers attach that the core does not interpret.
    ///
    /// Opaque to every invariant; carried through persistence untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

crate::record_builder! {
    /// Test builder for [`Task`].
    pub struct TaskBuilder for Task {
        text {
            task_id: TaskId = "T0001",
            workflow_id: WorkflowId = "wf-test",
            project_id: ProjectId = "PID-TEST-001",
            title: String = "test task",
        }
        value {
            task_type: TaskType = TaskType::Development,
            priority: TaskPriority = TaskPriority::Medium,
            status: TaskStatus = TaskStatus::Pending,
            estimated_hours: f64 = 1.0,
            file_paths: Vec<String> = Vec::new(),
            required_capabilities: BTreeSet<String> = BTreeSet::new(),
            created_at: u64 = 1_000_000,
        }
        unset {
            epic_id: EpicId,
            assigned_agent: AgentId,
        }
        fixed {
            metadata = serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

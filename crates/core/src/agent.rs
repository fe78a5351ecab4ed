// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Worker agent record, activity model, and claims.

use std::collections::BTreeSet;

use crate::id::{AgentId, TaskId};
use serde::{Deserialize, Serialize};

/// What an agent is currently doing.
///
/// The activity determines the effective heartbeat timeout: long-thinking
/// activities (decomposition, research) tolerate far longer silences than an
/// idle agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentActivity {
    Idle,
    Decomposition,
    Orchestration,
    TaskExecution,
    Research,
    ContextEnrichment,
    DependencyAnalysis,
}

impl AgentActivity {
    /// Multiplier over the base heartbeat interval for the effective timeout.
    pub fn timeout_multiplier(&self) -> u32 {
        match self {
            AgentActivity::Idle => 2,
            AgentActivity::TaskExecution => 6,
            AgentActivity::ContextEnrichment => 8,
            AgentActivity::Orchestration => 10,
            AgentActivity::DependencyAnalysis => 12,
            AgentActivity::Research => 15,
            AgentActivity::Decomposition => 20,
        }
    }

    /// Agents in decomposition or orchestration hold up the whole workflow
    /// and earn the fixed workflow-critical timeout extension.
    pub fn is_workflow_critical(&self) -> bool {
        matches!(self, AgentActivity::Decomposition | AgentActivity::Orchestration)
    }
}

crate::simple_display! {
    AgentActivity {
        Idle => "idle",
        Decomposition => "decomposition",
        Orchestration => "orchestration",
        TaskExecution => "task_execution",
        Research => "research",
        ContextEnrichment => "context_enrichment",
        DependencyAnalysis => "dependency_analysis",
    }
}

/// Agent availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Available,
    Busy,
    Offline,
}

crate::simple_display! {
    AgentStatus {
        Available => "available",
        Busy => "busy",
        Offline => "offline",
    }
}

/// A registered worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub name: String,
    pub capabilities: BTreeSet<String>,
    pub max_concurrent_tasks: usize,
    #[serde(default)]
    pub current_tasks: BTreeSet<TaskId>,
    pub status: AgentStatus,
    pub last_heartbeat: u64,
    pub current_activity: AgentActivity,
    /// Most recent self-reported progress in `[0, 100]`.
    #[serde(default)]
    pub progress_percentage: u8,
    pub activity_start_time: u64,
    /// Self-declared expected duration of the current activity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration_ms: Option<u64>,
    /// Progress-based timeout extension granted at the last progress report.
    #[serde(default)]
    pub timeout_extension_ms: u64,
    #[serde(default)]
    pub grace_period_count: u32,
    /// Completed/failed tallies feeding the assignment score.
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub tasks_failed: u64,
}

impl Agent {
    /// Whether this agent can take on another task right now.
    pub fn has_capacity(&self) -> bool {
        self.status != AgentStatus::Offline
            && self.current_tasks.len() < self.max_concurrent_tasks
    }

    /// Whether the capability set covers everything the task requires.
    pub fn covers(&self, required: &BTreeSet<String>) -> bool {
        required.iter().all(|cap| self.capabilities.contains(cap))
    }

    /// `busy ⇔ |current_tasks| > 0` (offline is sticky until a heartbeat).
    pub fn recompute_status(&mut self) {
        if self.status == AgentStatus::Offline {
            return;
        }
        self.status = if self.current_tasks.is_empty() {
            AgentStatus::Available
        } else {
            AgentStatus::Busy
        };
    }

    /// Fraction of completed tasks among all finished ones; optimistic 1.0
    /// for agents with no history yet.
    pub fn success_rate(&self) -> f64 {
        let finished = self.tasks_completed + self.tasks_failed;
        if finished == 0 {
            1.0
        } else {
            self.tasks_completed as f64 / finished as f64
        }
    }

    pub fn is_workflow_critical(&self) -> bool {
        self.current_activity.is_workflow_critical()
    }
}

crate::record_builder! {
    /// Test builder for [`Agent`].
    pub struct AgentBuilder for Agent {
        text {
            agent_id: AgentId = "agent-1",
            name: String = "test-agent",
        }
        value {
            capabilities: BTreeSet<String> = BTreeSet::new(),
            max_concurrent_tasks: usize = 1,
            current_tasks: BTreeSet<TaskId> = BTreeSet::new(),
            status: AgentStatus = AgentStatus::Available,
            last_heartbeat: u64 = 1_000_000,
            current_activity: AgentActivity = AgentActivity::Idle,
            progress_percentage: u8 = 0,
            activity_start_time: u64 = 1_000_000,
            timeout_extension_ms: u64 = 0,
            grace_period_count: u32 = 0,
            tasks_completed: u64 = 0,
            tasks_failed: u64 = 0,
        }
        unset {
            expected_duration_ms: u64,
        }
    }
}

/// An agent's exclusive, time-limited hold on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub claimed_at: u64,
    pub expires_at: u64,
}

impl Claim {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Push the expiry out to at least `until_ms` (never shortens).
    pub fn extend_until(&mut self, until_ms: u64) {
        if until_ms > self.expires_at {
            self.expires_at = until_ms;
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Event types emitted by the orchestration engine.
//!
//! Serializes with `{"type": "domain:verb", ...fields}` format. Every state
//! change flows through exactly one of these; the transport layer fans them
//! out to push subscribers and the daemon log.

use crate::agent::AgentActivity;
use crate::id::{AgentId, JobId, SessionId, TaskId, WorkflowId};
use crate::job::JobRecord;
use crate::task::TaskStatus;
use crate::workflow::WorkflowStatus;
use serde::{Deserialize, Serialize};

/// Events that observers can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- job --
    #[serde(rename = "job:started")]
    JobStarted { job: JobRecord, timestamp: u64 },

    /// Emitted on every job update; the push-transport `jobProgress` frame.
    #[serde(rename = "job:progress")]
    JobProgress { job: JobRecord, timestamp: u64 },

    // -- workflow --
    #[serde(rename = "workflow:created")]
    WorkflowCreated {
        workflow_id: WorkflowId,
        session_id: SessionId,
        task_count: usize,
        timestamp: u64,
    },

    #[serde(rename = "workflow:status")]
    WorkflowStatusChanged {
        workflow_id: WorkflowId,
        session_id: SessionId,
        status: WorkflowStatus,
        timestamp: u64,
    },

    // -- task --
    #[serde(rename = "task:transition")]
    TaskTransition {
        workflow_id: WorkflowId,
        session_id: SessionId,
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        reason: String,
        timestamp: u64,
    },

    #[serde(rename = "task:assigned")]
    TaskAssigned {
        workflow_id: WorkflowId,
        session_id: SessionId,
        task_id: TaskId,
        agent_id: AgentId,
        score: f64,
        timestamp: u64,
    },

    // -- agent --
    #[serde(rename = "agent:registered")]
    AgentRegistered { agent_id: AgentId, timestamp: u64 },

    #[serde(rename = "agent:deregistered")]
    AgentDeregistered { agent_id: AgentId, timestamp: u64 },

    /// Agent missed its activity deadline and entered a grace period.
    #[serde(rename = "agent:grace_period")]
    AgentGracePeriod {
        agent_id: AgentId,
        activity: AgentActivity,
        grace_period_count: u32,
        timestamp: u64,
    },

    #[serde(rename = "agent:offline")]
    AgentOffline { agent_id: AgentId, released_tasks: Vec<TaskId>, timestamp: u64 },

    #[serde(rename = "claim:released")]
    ClaimReleased { task_id: TaskId, agent_id: AgentId, reason: String, timestamp: u64 },
}

impl Event {
    /// Session this event belongs to, if it is session-scoped.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Event::JobStarted { job, .. } | Event::JobProgress { job, .. } => {
                Some(&job.session_id)
            }
            Event::WorkflowCreated { session_id, .. }
            | Event::WorkflowStatusChanged { session_id, .. }
            | Event::TaskTransition { session_id, .. }
            | Event::TaskAssigned { session_id, .. } => Some(session_id),
            Event::AgentRegistered { .. }
            | Event::AgentDeregistered { .. }
            | Event::AgentGracePeriod { .. }
            | Event::AgentOffline { .. }
            | Event::ClaimReleased { .. } => None,
        }
    }

    /// Job this event concerns, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobStarted { job, .. } | Event::JobProgress { job, .. } => Some(&job.job_id),
            _ => None,
        }
    }

    /// Progress events may be coalesced; state changes never are.
    pub fn is_droppable_progress(&self) -> bool {
        match self {
            Event::JobProgress { job, .. } => !job.status.is_terminal(),
            _ => false,
        }
    }

    /// One-line summary for the daemon log.
    pub fn log_summary(&self) -> String {
        let t = self.type_tag();
        match self {
            Event::JobStarted { job, .. } => {
                format!("{t} id={} tool={} transport={}", job.job_id, job.tool_name, job.transport)
            }
            Event::JobProgress { job, .. } => {
                format!("{t} id={} status={} progress={}", job.job_id, job.status, job.progress)
            }
            Event::WorkflowCreated { workflow_id, task_count, .. } => {
                format!("{t} id={workflow_id} tasks={task_count}")
            }
            Event::WorkflowStatusChanged { workflow_id, status, .. } => {
                format!("{t} id={workflow_id} status={status}")
            }
            Event::TaskTransition { task_id, from, to, .. } => {
                format!("{t} id={task_id} {from}->{to}")
            }
            Event::TaskAssigned { task_id, agent_id, score, .. } => {
                format!("{t} id={task_id} agent={agent_id} score={score:.2}")
            }
            Event::AgentRegistered { agent_id, .. }
            | Event::AgentDeregistered { agent_id, .. } => format!("{t} id={agent_id}"),
            Event::AgentGracePeriod { agent_id, grace_period_count, .. } => {
                format!("{t} id={agent_id} count={grace_period_count}")
            }
            Event::AgentOffline { agent_id, released_tasks, .. } => {
                format!("{t} id={agent_id} released={}", released_tasks.len())
            }
            Event::ClaimReleased { task_id, agent_id, reason, .. } => {
                format!("{t} task={task_id} agent={agent_id} reason={reason}")
            }
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Event::JobStarted { .. } => "job:started",
            Event::JobProgress { .. } => "job:progress",
            Event::WorkflowCreated { .. } => "workflow:created",
            Event::WorkflowStatusChanged { .. } => "workflow:status",
            Event::TaskTransition { .. } => "task:transition",
            Event::TaskAssigned { .. } => "task:assigned",
            Event::AgentRegistered { .. } => "agent:registered",
            Event::AgentDeregistered { .. } => "agent:deregistered",
            Event::AgentGracePeriod { .. } => "agent:grace_period",
            Event::AgentOffline { .. } => "agent:offline",
            Event::ClaimReleased { .. } => "claim:released",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

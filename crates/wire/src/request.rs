// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Requests from callers and agents to the daemon.

use std::collections::BTreeSet;

use maestro_core::{AgentActivity, AgentId, JobId, SessionId, TaskId, TaskPriority, TaskType, TransportHint, WorkflowId};
use serde::{Deserialize, Serialize};

/// The tool invocation envelope (§ external interfaces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub session_id: SessionId,
    pub transport: TransportHint,
    pub tool: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One task as submitted by a caller; IDs are allocated server-side.
///
/// `depends_on` holds indexes into the submitted task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    #[serde(default)]
    pub depends_on: Vec<usize>,
    /// Edge strength for the `depends_on` entries: "requires" (default) or
    /// "suggests". Unknown strings are reported by the validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_type: Option<String>,
    /// Epic grouping label; tasks sharing a label land in the same epic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

/// Request from a client connection to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Start a job from a tool invocation envelope
    Invoke { envelope: ToolEnvelope },

    /// Poll a job for progress/result
    GetJobResult { session_id: SessionId, job_id: JobId },

    /// Upgrade this connection into a push event stream.
    ///
    /// With a session ID only that session's events are delivered;
    /// without one the stream carries everything (agent monitors).
    Subscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },

    /// Cancel a workflow and its tasks
    CancelWorkflow { workflow_id: WorkflowId, reason: String },

    /// Cancel one task and its not-yet-started dependents
    CancelTask { task_id: TaskId, reason: String },

    PauseWorkflow { workflow_id: WorkflowId },

    ResumeWorkflow { workflow_id: WorkflowId },

    // -- agent protocol --
    /// Register a worker agent
    RegisterAgent {
        agent_id: AgentId,
        name: String,
        #[serde(default)]
        capabilities: BTreeSet<String>,
        max_concurrent_tasks: usize,
    },

    DeregisterAgent { agent_id: AgentId },

    /// Liveness and optional activity/progress signal
    Heartbeat {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        activity: Option<AgentActivity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_duration_ms: Option<u64>,
    },

    /// Claim a specific task, or the next ready one
    Claim {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
    },

    /// Success report
    Complete {
        agent_id: AgentId,
        task_id: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default)]
        files_modified: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tests_passed: Option<bool>,
    },

    /// Request human assistance; parks the task as blocked
    Help { agent_id: AgentId, task_id: TaskId, issue: String },

    /// Report a blocker; parks the task as blocked
    Block {
        agent_id: AgentId,
        task_id: TaskId,
        blocker_type: String,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_resolution: Option<String>,
    },

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

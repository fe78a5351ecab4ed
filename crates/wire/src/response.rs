// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Responses and push frames from the daemon.

use maestro_core::{
    Agent, Error, Event, JobId, JobRecord, RateLimit, Task, Workflow, WorkflowId,
};
use maestro_graph::ValidationReport;
use serde::{Deserialize, Serialize};

/// Daemon status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub version: String,
    pub uptime_ms: u64,
    pub jobs: usize,
    pub workflows: usize,
    pub agents: usize,
}

/// Response to a client request, or a pushed event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    /// Job initiation: `poll_interval_ms` is zero on push transport.
    JobStarted {
        job_id: JobId,
        message: String,
        poll_interval_ms: u64,
        /// Present when the invocation immediately produced a workflow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workflow_id: Option<WorkflowId>,
        /// Dependency diagnostics for orchestration invocations.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report: Option<ValidationReport>,
    },

    /// Job-result retrieval.
    JobResult {
        job: JobRecord,
        poll_interval_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit: Option<RateLimit>,
    },

    /// The connection is now a push stream; frames follow.
    Subscribed,

    /// A pushed event frame.
    Push { event: Event },

    Registered { agent: Agent },

    TaskClaimed { task: Task },

    WorkflowState { workflow: Workflow },

    Status { status: StatusSummary },

    /// Generic success for mutations with nothing else to say.
    Ack,

    /// Structured failure.
    Error { error: Error },
}

impl Response {
    pub fn error(error: Error) -> Self {
        Response::Error { error }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

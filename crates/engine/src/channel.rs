// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Agent communication seam.
//!
//! The coordinator drives tasks through this trait; the daemon's in-tree
//! implementation routes through the claim/heartbeat tables, and tests
//! substitute a scripted fake.

use async_trait::async_trait;
use maestro_core::{Agent, AgentId, Error, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// How an execution ended, from the agent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcomeStatus {
    Completed,
    Failed,
    Blocked,
}

impl TaskOutcomeStatus {
    pub fn as_task_status(&self) -> TaskStatus {
        match self {
            TaskOutcomeStatus::Completed => TaskStatus::Completed,
            TaskOutcomeStatus::Failed => TaskStatus::Failed,
            TaskOutcomeStatus::Blocked => TaskStatus::Blocked,
        }
    }
}

/// Completion report for one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: TaskOutcomeStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,
}

impl TaskOutcome {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: TaskOutcomeStatus::Completed,
            message: message.into(),
            result: None,
            files_modified: Vec::new(),
            tests_passed: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TaskOutcomeStatus::Failed,
            message: message.into(),
            result: None,
            files_modified: Vec::new(),
            tests_passed: None,
        }
    }
}

/// Transport to a worker agent.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Hand a task to an agent and wait for its outcome.
    ///
    /// Implementations must return promptly once `cancel` fires; the
    /// coordinator applies its own deadline on top.
    async fn execute(
        &self,
        agent: &Agent,
        task: &Task,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome, Error>;

    /// Ask an agent to abort a task (cooperative; fire and forget).
    async fn abort(&self, agent_id: &AgentId, task_id: &TaskId) -> Result<(), Error>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::ScriptedChannel;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Scripted channel for tests: per-task outcomes, optional delays,
    /// recorded abort calls.
    #[derive(Default)]
    pub struct ScriptedChannel {
        outcomes: Mutex<HashMap<TaskId, TaskOutcome>>,
        delay: Mutex<Option<Duration>>,
        aborted: Mutex<Vec<TaskId>>,
    }

    impl ScriptedChannel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the outcome for a task; unscripted tasks complete.
        pub fn script(&self, task_id: impl Into<TaskId>, outcome: TaskOutcome) {
            self.outcomes.lock().insert(task_id.into(), outcome);
        }

        /// Delay every execution (for cancellation/timeout tests).
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        pub fn aborted_tasks(&self) -> Vec<TaskId> {
            self.aborted.lock().clone()
        }
    }

    #[async_trait]
    impl AgentChannel for ScriptedChannel {
        async fn execute(
            &self,
            _agent: &Agent,
            task: &Task,
            cancel: CancellationToken,
        ) -> Result<TaskOutcome, Error> {
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return Ok(TaskOutcome::failed("cancelled"));
                    }
                }
            }
            let scripted = self.outcomes.lock().get(&task.task_id).cloned();
            Ok(scripted.unwrap_or_else(|| TaskOutcome::completed("done")))
        }

        async fn abort(&self, _agent_id: &AgentId, task_id: &TaskId) -> Result<(), Error> {
            self.aborted.lock().push(task_id.clone());
            Ok(())
        }
    }
}

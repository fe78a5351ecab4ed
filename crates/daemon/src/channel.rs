// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Protocol-observing agent channel.
//!
//! Agents in this daemon are external processes speaking the wire protocol:
//! the dispatch loop claims a task for the best agent and announces it; the
//! agent works, heartbeats, and reports completion through its own requests.
//! This channel therefore *observes* the task's transition stream rather
//! than pushing bytes at the agent.

use std::sync::Arc;

use async_trait::async_trait;
use maestro_core::{Agent, AgentId, Clock, Error, Event, Task, TaskId, TaskStatus};
use maestro_engine::{AgentChannel, EventEmitter, TaskOutcome, TaskOutcomeStatus};
use tokio_util::sync::CancellationToken;

pub struct ProtocolChannel<C: Clock> {
    emitter: Arc<EventEmitter<C>>,
    clock: C,
}

impl<C: Clock> ProtocolChannel<C> {
    pub fn new(emitter: Arc<EventEmitter<C>>, clock: C) -> Self {
        Self { emitter, clock }
    }
}

#[async_trait]
impl<C: Clock> AgentChannel for ProtocolChannel<C> {
    async fn execute(
        &self,
        _agent: &Agent,
        task: &Task,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome, Error> {
        // Subscribe before checking state so no transition slips between.
        let mut events = self.emitter.subscribe();
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(TaskOutcome::failed("cancelled"));
                }
                event = events.recv() => match event {
                    Ok(event) => event,
                    // lagged subscribers just resubscribe at the tail
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        return Ok(TaskOutcome::failed("event stream closed"));
                    }
                },
            };
            let Event::TaskTransition { task_id, to, reason, .. } = event else {
                continue;
            };
            if task_id != task.task_id {
                continue;
            }
            let status = match to {
                TaskStatus::Completed => TaskOutcomeStatus::Completed,
                TaskStatus::Failed => TaskOutcomeStatus::Failed,
                TaskStatus::Blocked => TaskOutcomeStatus::Blocked,
                TaskStatus::Cancelled => {
                    return Ok(TaskOutcome::failed("cancelled"));
                }
                TaskStatus::Pending | TaskStatus::InProgress => continue,
            };
            return Ok(TaskOutcome {
                status,
                message: reason,
                result: None,
                files_modified: Vec::new(),
                tests_passed: None,
            });
        }
    }

    async fn abort(&self, agent_id: &AgentId, task_id: &TaskId) -> Result<(), Error> {
        // Cooperative: the agent sees this on its subscription stream.
        self.emitter.emit(Event::ClaimReleased {
            task_id: task_id.clone(),
            agent_id: agent_id.clone(),
            reason: "cancellation requested".to_string(),
            timestamp: self.clock.epoch_ms(),
        });
        Ok(())
    }
}

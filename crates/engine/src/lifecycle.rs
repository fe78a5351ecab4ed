// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Task state machine enforcement.
//!
//! Every task mutation in the system goes through [`transition_task`]; the
//! legal-transition table on [`TaskStatus`] is the single authority.

use maestro_core::{
    Error, ErrorContext, ErrorKind, TaskId, TaskStatus, TransitionRecord, Workflow,
};

/// Context for one requested transition.
#[derive(Debug, Clone)]
pub struct TransitionRequest<'a> {
    pub task_id: &'a TaskId,
    pub to: TaskStatus,
    pub reason: &'a str,
    pub triggered_by: &'a str,
    pub is_automated: bool,
}

/// Apply a transition, enforcing the legal table and recording history.
///
/// Rejections carry `{from, to, valid_transitions}` in the error context.
/// Completion additionally requires every hard prerequisite to be completed.
pub fn transition_task(
    workflow: &mut Workflow,
    req: TransitionRequest<'_>,
    now_ms: u64,
    max_history: usize,
) -> Result<TransitionRecord, Error> {
    let task = workflow
        .tasks
        .get(req.task_id.as_str())
        .ok_or_else(|| Error::not_found("task", req.task_id))?;
    let from = task.status;

    if !from.can_become(req.to) {
        let valid: Vec<String> =
            from.valid_transitions().iter().map(|s| s.to_string()).collect();
        return Err(Error::new(
            ErrorKind::Conflict,
            format!("invalid transition {from} -> {} for task {}", req.to, req.task_id),
        )
        .with_context(
            ErrorContext::new("lifecycle", "transition")
                .entity(req.task_id.as_str())
                .entity(workflow.workflow_id.as_str())
                .meta("from", serde_json::json!(from))
                .meta("to", serde_json::json!(req.to))
                .meta("valid_transitions", serde_json::json!(valid)),
        ));
    }

    if req.to == TaskStatus::Completed {
        let unmet: Vec<&TaskId> = workflow
            .dependencies
            .iter()
            .filter(|d| d.is_hard() && &d.to == req.task_id)
            .filter(|d| {
                workflow
                    .tasks
                    .get(d.from.as_str())
                    .is_none_or(|t| t.status != TaskStatus::Completed)
            })
            .map(|d| &d.from)
            .collect();
        if !unmet.is_empty() {
            return Err(Error::new(
                ErrorKind::Conflict,
                format!(
                    "task {} cannot complete with incomplete prerequisites: {}",
                    req.task_id,
                    unmet.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", "),
                ),
            )
            .with_context(
                ErrorContext::new("lifecycle", "transition").entity(req.task_id.as_str()),
            ));
        }
    }

    let record = TransitionRecord {
        task_id: req.task_id.clone(),
        from,
        to: req.to,
        timestamp: now_ms,
        reason: req.reason.to_string(),
        triggered_by: req.triggered_by.to_string(),
        is_automated: req.is_automated,
    };

    if let Some(task) = workflow.tasks.get_mut(req.task_id.as_str()) {
        task.status = req.to;
        if req.to != TaskStatus::InProgress {
            task.assigned_agent = None;
        }
    }
    workflow.record_transition(record.clone(), max_history);
    Ok(record)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

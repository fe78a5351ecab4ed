// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Request dispatch: wire requests to engine operations.

use std::sync::Arc;

use maestro_core::id::{validate_project_name, NameValidation};
use maestro_core::job::JobPatch;
use maestro_core::{
    Dependency, DependencyType, Error, ErrorContext, ErrorKind, JobStatus, SessionId, Task,
};
use maestro_engine::RegisterAgent;
use maestro_graph::{ValidationError, ValidationReport};
use maestro_wire::{Request, Response, StatusSummary, TaskSpec, ToolEnvelope};
use serde::Deserialize;
use tracing::info;

use crate::config::PROTOCOL_VERSION;
use crate::lifecycle::DaemonState;

/// Arguments of the `orchestrate` tool.
#[derive(Debug, Deserialize)]
struct OrchestrateArgs {
    project: String,
    tasks: Vec<TaskSpec>,
}

/// Dispatch one request. `Subscribe` is handled by the listener; everything
/// else lands here.
pub async fn dispatch(daemon: &Arc<DaemonState>, request: Request) -> Response {
    match handle(daemon, request).await {
        Ok(response) => response,
        Err(error) => Response::error(error),
    }
}

async fn handle(daemon: &Arc<DaemonState>, request: Request) -> Result<Response, Error> {
    match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version } => {
            info!(client_version = %version, "hello");
            Ok(Response::Pong)
        }

        Request::Invoke { envelope } => invoke(daemon, envelope).await,

        Request::GetJobResult { session_id, job_id } => {
            let result = daemon.jobs.get_job_result(&session_id, &job_id)?;
            Ok(Response::JobResult {
                job: result.job,
                poll_interval_ms: result.poll_interval_ms,
                rate_limit: result.rate_limit,
            })
        }

        Request::CancelWorkflow { workflow_id, reason } => {
            daemon.coordinator.cancel_workflow(&workflow_id, &reason, "caller").await?;
            Ok(Response::Ack)
        }

        Request::CancelTask { task_id, reason } => {
            daemon.coordinator.cancel_task(&task_id, &reason, "caller").await?;
            Ok(Response::Ack)
        }

        Request::PauseWorkflow { workflow_id } => {
            daemon.coordinator.pause_workflow(&workflow_id)?;
            Ok(Response::Ack)
        }

        Request::ResumeWorkflow { workflow_id } => {
            daemon.coordinator.resume_workflow(&workflow_id).await?;
            Ok(Response::Ack)
        }

        Request::RegisterAgent { agent_id, name, capabilities, max_concurrent_tasks } => {
            let agent = daemon.registry.register(RegisterAgent {
                agent_id,
                name,
                capabilities,
                max_concurrent_tasks,
            })?;
            daemon.coordinator.retry_pending().await;
            Ok(Response::Registered { agent })
        }

        Request::DeregisterAgent { agent_id } => {
            let released = daemon.registry.deregister(&agent_id)?;
            for task_id in released {
                daemon.coordinator.requeue_released(&task_id).await;
            }
            Ok(Response::Ack)
        }

        Request::Heartbeat { agent_id, activity, progress, expected_duration_ms } => {
            daemon
                .coordinator
                .agent_heartbeat(&agent_id, activity, progress, expected_duration_ms)
                .await?;
            Ok(Response::Ack)
        }

        Request::Claim { agent_id, task_id } => {
            let task = daemon.coordinator.agent_claim(&agent_id, task_id).await?;
            Ok(Response::TaskClaimed { task })
        }

        Request::Complete { agent_id, task_id, result, files_modified, tests_passed } => {
            daemon
                .coordinator
                .agent_complete(&agent_id, &task_id, result, files_modified, tests_passed)
                .await?;
            Ok(Response::Ack)
        }

        Request::Help { agent_id, task_id, issue } => {
            daemon.coordinator.agent_help(&agent_id, &task_id, &issue).await?;
            Ok(Response::Ack)
        }

        Request::Block { agent_id, task_id, blocker_type, description, suggested_resolution } => {
            daemon
                .coordinator
                .agent_block(
                    &agent_id,
                    &task_id,
                    &blocker_type,
                    &description,
                    suggested_resolution.as_deref(),
                )
                .await?;
            Ok(Response::Ack)
        }

        Request::Status => Ok(Response::Status {
            status: StatusSummary {
                version: PROTOCOL_VERSION.to_string(),
                uptime_ms: daemon.start_time.elapsed().as_millis() as u64,
                jobs: daemon.jobs.snapshot().len(),
                workflows: daemon.coordinator.workflow_count(),
                agents: daemon.registry.agent_count(),
            },
        }),

        // handled by the listener / main loop
        Request::Subscribe { .. } | Request::Shutdown => Ok(Response::Ack),
    }
}

/// Start a job from a tool envelope. The `orchestrate` tool builds a
/// workflow; unknown tools are validation errors.
async fn invoke(daemon: &Arc<DaemonState>, envelope: ToolEnvelope) -> Result<Response, Error> {
    if envelope.tool != "orchestrate" {
        return Err(Error::new(
            ErrorKind::Validation,
            format!("unknown tool {:?}", envelope.tool),
        )
        .with_context(ErrorContext::new("transport", "invoke")));
    }
    let args: OrchestrateArgs = serde_json::from_value(envelope.arguments.clone())
        .map_err(|e| {
            Error::new(ErrorKind::Validation, format!("invalid orchestrate arguments: {e}"))
                .with_context(ErrorContext::new("transport", "invoke"))
        })?;

    let (tasks, dependencies, type_errors) =
        materialize_tasks(daemon, &envelope.session_id, args)?;

    let (job, poll_interval_ms) =
        daemon
            .jobs
            .start_job(envelope.session_id.clone(), envelope.transport, &envelope.tool);

    if !type_errors.is_empty() {
        let _ = daemon.jobs.update_job(
            &job.job_id,
            JobPatch {
                status: Some(JobStatus::Failed),
                message: Some("dependency validation failed".to_string()),
                ..Default::default()
            },
        );
        let report = ValidationReport { errors: type_errors, ..Default::default() };
        return Ok(Response::JobStarted {
            job_id: job.job_id,
            message: "dependency validation failed".to_string(),
            poll_interval_ms,
            workflow_id: None,
            report: Some(report),
        });
    }

    let outcome = daemon
        .coordinator
        .submit_workflow(
            envelope.session_id.clone(),
            Some(job.job_id.clone()),
            tasks,
            dependencies,
        )
        .await?;

    let message = match &outcome.workflow_id {
        Some(workflow_id) => {
            let _ = daemon.jobs.update_job(
                &job.job_id,
                JobPatch {
                    status: Some(JobStatus::Running),
                    message: Some(format!("workflow {workflow_id} started")),
                    ..Default::default()
                },
            );
            "job started".to_string()
        }
        None => {
            let _ = daemon.jobs.update_job(
                &job.job_id,
                JobPatch {
                    status: Some(JobStatus::Failed),
                    message: Some("dependency validation failed".to_string()),
                    ..Default::default()
                },
            );
            "dependency validation failed".to_string()
        }
    };

    Ok(Response::JobStarted {
        job_id: job.job_id,
        message,
        poll_interval_ms,
        workflow_id: outcome.workflow_id,
        report: Some(outcome.report),
    })
}

/// Allocate IDs and turn task specs into core tasks plus dependency edges.
///
/// Unknown dependency-type strings become validator errors rather than
/// request failures, so the caller gets a structured report.
#[allow(clippy::type_complexity)]
fn materialize_tasks(
    daemon: &Arc<DaemonState>,
    _session_id: &SessionId,
    args: OrchestrateArgs,
) -> Result<(Vec<Task>, Vec<Dependency>, Vec<ValidationError>), Error> {
    let project_segment = match validate_project_name(&args.project) {
        NameValidation::Valid { segment } => segment,
        NameValidation::Invalid { reason, suggestion } => {
            return Err(Error::new(
                ErrorKind::Validation,
                format!("{reason}; try {suggestion:?}"),
            )
            .with_context(ErrorContext::new("transport", "invoke")));
        }
    };
    let taken_project = |_: &str| false;
    let project_id = daemon
        .counters
        .next_project_id(&project_segment, taken_project)
        .map_err(Error::from)?;

    // one epic per distinct label, in first-seen order
    let mut epics: std::collections::HashMap<&str, maestro_core::EpicId> =
        std::collections::HashMap::new();
    for spec in &args.tasks {
        if let Some(label) = spec.epic.as_deref() {
            if !epics.contains_key(label) {
                let epic_id =
                    daemon.counters.next_epic_id(|_| false).map_err(Error::from)?;
                epics.insert(label, epic_id);
            }
        }
    }

    let now = daemon.clock_ms();
    let mut tasks = Vec::with_capacity(args.tasks.len());
    for spec in &args.tasks {
        let task_id = daemon
            .counters
            .next_task_id(|id| daemon.coordinator.contains_task_str(id))
            .map_err(Error::from)?;
        tasks.push(Task {
            task_id,
            workflow_id: "".into(),
            project_id: project_id.clone(),
            epic_id: spec.epic.as_deref().and_then(|label| epics.get(label).cloned()),
            title: spec.title.clone(),
            task_type: spec.task_type,
            priority: spec.priority,
            status: maestro_core::TaskStatus::Pending,
            estimated_hours: spec.estimated_hours,
            file_paths: spec.file_paths.clone(),
            required_capabilities: spec.required_capabilities.clone(),
            created_at: now,
            assigned_agent: None,
            metadata: serde_json::Map::new(),
        });
    }

    let mut dependencies = Vec::new();
    let mut type_errors = Vec::new();
    for (index, spec) in args.tasks.iter().enumerate() {
        let dep_type = match spec.dependency_type.as_deref() {
            None | Some("requires") => DependencyType::Requires,
            Some("suggests") => DependencyType::Suggests,
            Some(_) => {
                for &dep_index in &spec.depends_on {
                    if let Some(prerequisite) = tasks.get(dep_index) {
                        type_errors.push(ValidationError::InvalidDependencyType {
                            from: prerequisite.task_id.clone(),
                            to: tasks[index].task_id.clone(),
                        });
                    }
                }
                continue;
            }
        };
        for &dep_index in &spec.depends_on {
            let Some(prerequisite) = tasks.get(dep_index) else {
                return Err(Error::new(
                    ErrorKind::Validation,
                    format!("task {index} depends on unknown task index {dep_index}"),
                )
                .with_context(ErrorContext::new("transport", "invoke")));
            };
            let from = prerequisite.task_id.clone();
            let to = tasks[index].task_id.clone();
            let dependency_id = daemon
                .counters
                .next_dependency_id(&from, &to, |_| false)
                .map_err(Error::from)?;
            dependencies.push(Dependency { dependency_id: Some(dependency_id), from, to, dep_type });
        }
    }
    Ok((tasks, dependencies, type_errors))
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

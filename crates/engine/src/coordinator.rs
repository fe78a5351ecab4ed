// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Unified lifecycle and execution coordinator.
//!
//! Owns Workflow and Task mutations. Each workflow sits behind its own lock;
//! the outer map lock is only held to resolve membership. No lock is held
//! across channel I/O or store writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use maestro_core::config::OrchestratorConfig;
use maestro_core::job::JobPatch;
use maestro_core::{
    AgentActivity, AgentId, Clock, Dependency, Error, ErrorContext, ErrorKind, Event, JobId,
    JobStatus, SessionId, Task, TaskId, TaskStatus, TransitionRecord, Workflow, WorkflowId,
    WorkflowPhase, WorkflowStatus,
};
use maestro_graph::{validate_dependencies, ValidationReport};
use maestro_storage::WorkflowStore;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channel::{AgentChannel, TaskOutcome, TaskOutcomeStatus};
use crate::events::EventEmitter;
use crate::lifecycle::{transition_task, TransitionRequest};
use crate::poll::JobController;
use crate::registry::AgentRegistry;

/// One entry on the execution queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub workflow_id: WorkflowId,
    pub task_id: TaskId,
}

/// Result of a workflow submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Present only when validation passed and the workflow was created.
    pub workflow_id: Option<WorkflowId>,
    pub report: ValidationReport,
}

/// The coordinator service.
pub struct Coordinator<C: Clock> {
    config: OrchestratorConfig,
    clock: C,
    emitter: Arc<EventEmitter<C>>,
    jobs: Arc<JobController<C>>,
    registry: Arc<AgentRegistry<C>>,
    channel: Arc<dyn AgentChannel>,
    store: WorkflowStore,
    workflows: RwLock<HashMap<WorkflowId, Arc<Mutex<Workflow>>>>,
    /// task -> owning workflow, for claim-release and agent-protocol paths.
    task_index: Mutex<HashMap<TaskId, WorkflowId>>,
    /// workflow -> externally observable job.
    job_links: Mutex<HashMap<WorkflowId, JobId>>,
    /// live cancellation tokens per in-flight task.
    running: Mutex<HashMap<TaskId, CancellationToken>>,
    queue_tx: mpsc::Sender<QueuedTask>,
}

impl<C: Clock> Coordinator<C> {
    /// Build the coordinator and its execution queue receiver.
    ///
    /// The receiver must be passed to [`run`](Self::run) on a spawned task.
    #[allow(clippy::type_complexity)]
    pub fn new(
        config: OrchestratorConfig,
        clock: C,
        emitter: Arc<EventEmitter<C>>,
        jobs: Arc<JobController<C>>,
        registry: Arc<AgentRegistry<C>>,
        channel: Arc<dyn AgentChannel>,
        store: WorkflowStore,
    ) -> (Arc<Self>, mpsc::Receiver<QueuedTask>) {
        let (queue_tx, queue_rx) = mpsc::channel(config.execution.queue_capacity);
        let coordinator = Arc::new(Self {
            config,
            clock,
            emitter,
            jobs,
            registry,
            channel,
            store,
            workflows: RwLock::new(HashMap::new()),
            task_index: Mutex::new(HashMap::new()),
            job_links: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
            queue_tx,
        });
        (coordinator, queue_rx)
    }

    /// Worker loop: pull ready tasks while respecting the concurrency cap.
    pub async fn run(
        self: Arc<Self>,
        mut queue_rx: mpsc::Receiver<QueuedTask>,
        shutdown: CancellationToken,
    ) {
        let semaphore =
            Arc::new(Semaphore::new(self.config.execution.max_concurrent_executions));
        loop {
            let item = tokio::select! {
                _ = shutdown.cancelled() => break,
                item = queue_rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let coordinator = Arc::clone(&self);
            tokio::spawn(async move {
                coordinator.execute_queued(item).await;
                drop(permit);
            });
        }
        info!("execution loop stopped");
    }

    /// Create a workflow from validated tasks and edges.
    ///
    /// On validation failure no workflow is created and the report carries
    /// the diagnostics.
    pub async fn submit_workflow(
        &self,
        session_id: SessionId,
        job_id: Option<JobId>,
        mut tasks: Vec<Task>,
        dependencies: Vec<Dependency>,
    ) -> Result<SubmitOutcome, Error> {
        let report = validate_dependencies(&tasks, &dependencies, &self.config.graph);
        if !report.is_valid() {
            return Ok(SubmitOutcome { workflow_id: None, report });
        }

        let now = self.clock.epoch_ms();
        let workflow_id = WorkflowId::generate();
        let mut workflow = Workflow::new(workflow_id.clone(), session_id.clone(), now);
        workflow.phase = WorkflowPhase::Execution;
        workflow.status = WorkflowStatus::Running;
        for task in tasks.iter_mut() {
            task.workflow_id = workflow_id.clone();
        }
        for task in tasks {
            workflow.tasks.insert(task.task_id.clone(), task);
        }
        workflow.dependencies = dependencies;
        workflow.check_dependency_endpoints()?;

        self.save_with_retry(&workflow)?;

        {
            let mut index = self.task_index.lock();
            for task_id in workflow.tasks.keys() {
                index.insert(task_id.clone(), workflow_id.clone());
            }
        }
        if let Some(job_id) = job_id {
            self.job_links.lock().insert(workflow_id.clone(), job_id);
        }
        let task_count = workflow.tasks.len();
        let ready = workflow.ready_tasks();
        self.workflows
            .write()
            .insert(workflow_id.clone(), Arc::new(Mutex::new(workflow)));

        self.emitter.emit(Event::WorkflowCreated {
            workflow_id: workflow_id.clone(),
            session_id,
            task_count,
            timestamp: now,
        });
        for task_id in ready {
            self.enqueue(workflow_id.clone(), task_id).await;
        }
        Ok(SubmitOutcome { workflow_id: Some(workflow_id), report })
    }

    /// Push a ready task onto the bounded execution queue (blocks on
    /// backpressure).
    async fn enqueue(&self, workflow_id: WorkflowId, task_id: TaskId) {
        let item = QueuedTask { workflow_id, task_id };
        if self.queue_tx.send(item).await.is_err() {
            warn!("execution queue closed; task dropped");
        }
    }

    /// Execute one queued task end to end.
    async fn execute_queued(&self, item: QueuedTask) {
        let Some(handle) = self.workflow_handle(&item.workflow_id) else {
            return;
        };

        // re-check readiness under the workflow lock
        let task = {
            let workflow = handle.lock();
            if workflow.status != WorkflowStatus::Running || !workflow.is_ready(&item.task_id) {
                return;
            }
            match workflow.tasks.get(item.task_id.as_str()) {
                Some(task) => task.clone(),
                None => return,
            }
        };

        let Some(assignment) = self.registry.assign(&task) else {
            self.registry.enqueue_pending(task);
            return;
        };
        let Some(agent) = self.registry.get(&assignment.agent_id) else {
            return;
        };

        let now = self.clock.epoch_ms();
        let session_id = {
            let mut workflow = handle.lock();
            let result = transition_task(
                &mut workflow,
                TransitionRequest {
                    task_id: &item.task_id,
                    to: TaskStatus::InProgress,
                    reason: "dispatched to agent",
                    triggered_by: assignment.agent_id.as_str(),
                    is_automated: true,
                },
                now,
                self.config.execution.max_workflow_history,
            );
            if let Err(e) = result {
                warn!(task = %item.task_id, error = %e, "dispatch transition rejected");
                self.registry.release(&item.task_id, None);
                return;
            }
            if let Some(task) = workflow.tasks.get_mut(item.task_id.as_str()) {
                task.assigned_agent = Some(assignment.agent_id.clone());
            }
            workflow.session_id.clone()
        };
        self.persist(&item.workflow_id);
        self.emitter.emit(Event::TaskAssigned {
            workflow_id: item.workflow_id.clone(),
            session_id: session_id.clone(),
            task_id: item.task_id.clone(),
            agent_id: assignment.agent_id.clone(),
            score: assignment.score,
            timestamp: now,
        });
        self.emit_transition(&item.workflow_id, &session_id, &item.task_id, TaskStatus::Pending, TaskStatus::InProgress, "dispatched to agent");
        self.touch_job(&item.workflow_id, None, Some("task dispatched")).await;

        let cancel = CancellationToken::new();
        self.running.lock().insert(item.task_id.clone(), cancel.clone());

        let outcome = self.execute_with_deadline(&agent, &task, cancel.clone()).await;

        self.running.lock().remove(&item.task_id);
        self.finish_task(&item.workflow_id, &item.task_id, &assignment.agent_id, outcome)
            .await;
    }

    /// Channel execution with the configured deadline; one retry with
    /// backoff on timeout, then the task fails.
    async fn execute_with_deadline(
        &self,
        agent: &maestro_core::Agent,
        task: &Task,
        cancel: CancellationToken,
    ) -> TaskOutcome {
        let deadline = Duration::from_millis(self.config.execution.execution_timeout_ms);
        for attempt in 0..2 {
            if attempt > 0 {
                let backoff =
                    Duration::from_millis(self.config.execution.retry_delay_ms << attempt);
                tokio::time::sleep(backoff).await;
            }
            match tokio::time::timeout(
                deadline,
                self.channel.execute(agent, task, cancel.clone()),
            )
            .await
            {
                Ok(Ok(outcome)) => return outcome,
                Ok(Err(e)) => {
                    warn!(task = %task.task_id, error = %e, "agent channel error");
                    return TaskOutcome::failed(e.to_string());
                }
                Err(_) => {
                    warn!(task = %task.task_id, attempt, "task execution deadline expired");
                }
            }
        }
        TaskOutcome::failed("task execution timed out")
    }

    /// Apply a task outcome: transition, release the claim, update the job,
    /// re-evaluate the ready set, finalize the workflow when done.
    async fn finish_task(
        &self,
        workflow_id: &WorkflowId,
        task_id: &TaskId,
        agent_id: &AgentId,
        outcome: TaskOutcome,
    ) {
        let succeeded = match outcome.status {
            TaskOutcomeStatus::Completed => Some(true),
            TaskOutcomeStatus::Failed => Some(false),
            // blocked is a park, not a verdict on the agent
            TaskOutcomeStatus::Blocked => None,
        };
        self.registry.release(task_id, succeeded);

        let Some(handle) = self.workflow_handle(workflow_id) else {
            return;
        };
        let now = self.clock.epoch_ms();
        let to = outcome.status.as_task_status();
        let (session_id, from) = {
            let mut workflow = handle.lock();
            let from = workflow
                .tasks
                .get(task_id.as_str())
                .map(|t| t.status)
                .unwrap_or(TaskStatus::InProgress);
            let result = transition_task(
                &mut workflow,
                TransitionRequest {
                    task_id,
                    to,
                    reason: &outcome.message,
                    triggered_by: agent_id.as_str(),
                    is_automated: true,
                },
                now,
                self.config.execution.max_workflow_history,
            );
            if let Err(e) = result {
                // cancellation raced the completion; the recorded state wins
                warn!(task = %task_id, error = %e, "terminal transition rejected");
                return;
            }
            (workflow.session_id.clone(), from)
        };
        self.persist(workflow_id);
        self.emit_transition(workflow_id, &session_id, task_id, from, to, &outcome.message);

        self.after_task_settled(workflow_id).await;
    }

    /// Enqueue newly ready tasks and finalize the workflow if everything is
    /// terminal. Also refreshes the linked job's progress.
    async fn after_task_settled(&self, workflow_id: &WorkflowId) {
        let Some(handle) = self.workflow_handle(workflow_id) else {
            return;
        };
        let (ready, progress, all_terminal, any_failed, any_cancelled, session_id, status) = {
            let workflow = handle.lock();
            let total = workflow.tasks.len().max(1);
            let terminal =
                workflow.tasks.values().filter(|t| t.status.is_terminal()).count();
            (
                workflow.ready_tasks(),
                (terminal * 100 / total) as u8,
                workflow.all_tasks_terminal(),
                workflow.tasks.values().any(|t| t.status == TaskStatus::Failed),
                workflow.tasks.values().any(|t| t.status == TaskStatus::Cancelled),
                workflow.session_id.clone(),
                workflow.status,
            )
        };

        if all_terminal && status == WorkflowStatus::Running {
            let end_status = if any_failed {
                WorkflowStatus::Failed
            } else if any_cancelled {
                WorkflowStatus::Cancelled
            } else {
                WorkflowStatus::Completed
            };
            self.finalize_workflow(workflow_id, &session_id, end_status).await;
            return;
        }

        self.touch_job(workflow_id, Some(progress), None).await;
        if status == WorkflowStatus::Running {
            for task_id in ready {
                self.enqueue(workflow_id.clone(), task_id).await;
            }
        }
    }

    async fn finalize_workflow(
        &self,
        workflow_id: &WorkflowId,
        session_id: &SessionId,
        end_status: WorkflowStatus,
    ) {
        let now = self.clock.epoch_ms();
        let summary = {
            let Some(handle) = self.workflow_handle(workflow_id) else {
                return;
            };
            let mut workflow = handle.lock();
            workflow.status = end_status;
            workflow.phase = WorkflowPhase::Cleanup;
            workflow.end_time = Some(now);
            task_summary(&workflow)
        };
        self.persist(workflow_id);
        info!(workflow = %workflow_id, status = %end_status, "workflow finished");
        self.emitter.emit(Event::WorkflowStatusChanged {
            workflow_id: workflow_id.clone(),
            session_id: session_id.clone(),
            status: end_status,
            timestamp: now,
        });

        let job_id = self.job_links.lock().get(workflow_id).cloned();
        if let Some(job_id) = job_id {
            let patch = match end_status {
                WorkflowStatus::Completed => JobPatch {
                    status: Some(JobStatus::Completed),
                    progress: Some(100),
                    message: Some("workflow completed".to_string()),
                    result: Some(summary),
                },
                WorkflowStatus::Cancelled => JobPatch {
                    status: Some(JobStatus::Cancelled),
                    message: Some("workflow cancelled".to_string()),
                    ..Default::default()
                },
                _ => JobPatch {
                    status: Some(JobStatus::Failed),
                    message: Some("workflow failed".to_string()),
                    ..Default::default()
                },
            };
            if let Err(e) = self.jobs.update_job(&job_id, patch) {
                warn!(job = %job_id, error = %e, "final job update rejected");
            }
        }
    }

    /// Cancel a whole workflow: every non-terminal task transitions to
    /// cancelled, agents are signalled cooperatively.
    pub async fn cancel_workflow(
        &self,
        workflow_id: &WorkflowId,
        reason: &str,
        triggered_by: &str,
    ) -> Result<(), Error> {
        let handle = self
            .workflow_handle(workflow_id)
            .ok_or_else(|| Error::not_found("workflow", workflow_id))?;
        let now = self.clock.epoch_ms();
        let (session_id, cancelled, in_flight) = {
            let mut workflow = handle.lock();
            let targets: Vec<TaskId> = workflow
                .tasks
                .values()
                .filter(|t| !t.status.is_terminal())
                .map(|t| t.task_id.clone())
                .collect();
            let mut cancelled = Vec::new();
            let mut in_flight = Vec::new();
            for task_id in targets {
                let from = workflow.tasks[task_id.as_str()].status;
                let agent = workflow.tasks[task_id.as_str()].assigned_agent.clone();
                let result = transition_task(
                    &mut workflow,
                    TransitionRequest {
                        task_id: &task_id,
                        to: TaskStatus::Cancelled,
                        reason,
                        triggered_by,
                        is_automated: false,
                    },
                    now,
                    self.config.execution.max_workflow_history,
                );
                if result.is_ok() {
                    cancelled.push((task_id.clone(), from));
                    if from == TaskStatus::InProgress {
                        in_flight.push((task_id, agent));
                    }
                }
            }
            workflow.status = WorkflowStatus::Cancelled;
            workflow.end_time = Some(now);
            (workflow.session_id.clone(), cancelled, in_flight)
        };
        self.persist(workflow_id);

        for (task_id, from) in &cancelled {
            self.registry.release(task_id, None);
            self.emit_transition(
                workflow_id,
                &session_id,
                task_id,
                *from,
                TaskStatus::Cancelled,
                reason,
            );
        }
        self.emitter.emit(Event::WorkflowStatusChanged {
            workflow_id: workflow_id.clone(),
            session_id: session_id.clone(),
            status: WorkflowStatus::Cancelled,
            timestamp: now,
        });
        self.signal_aborts(in_flight).await;

        let job_id = self.job_links.lock().get(workflow_id).cloned();
        if let Some(job_id) = job_id {
            let _ = self.jobs.update_job(
                &job_id,
                JobPatch {
                    status: Some(JobStatus::Cancelled),
                    message: Some(reason.to_string()),
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    /// Cancel one task plus its transitively dependent, not-yet-started
    /// tasks.
    pub async fn cancel_task(
        &self,
        task_id: &TaskId,
        reason: &str,
        triggered_by: &str,
    ) -> Result<Vec<TaskId>, Error> {
        let workflow_id = self.owning_workflow(task_id)?;
        let handle = self
            .workflow_handle(&workflow_id)
            .ok_or_else(|| Error::not_found("workflow", &workflow_id))?;
        let now = self.clock.epoch_ms();
        let (session_id, cancelled, in_flight) = {
            let mut workflow = handle.lock();
            let mut targets = vec![task_id.clone()];
            targets.extend(
                workflow
                    .dependents_of(task_id)
                    .into_iter()
                    .filter(|id| {
                        workflow
                            .tasks
                            .get(id.as_str())
                            .is_some_and(|t| t.status == TaskStatus::Pending)
                    }),
            );
            let mut cancelled = Vec::new();
            let mut in_flight = Vec::new();
            for target in targets {
                let Some(task) = workflow.tasks.get(target.as_str()) else {
                    continue;
                };
                let from = task.status;
                let agent = task.assigned_agent.clone();
                let result = transition_task(
                    &mut workflow,
                    TransitionRequest {
                        task_id: &target,
                        to: TaskStatus::Cancelled,
                        reason,
                        triggered_by,
                        is_automated: false,
                    },
                    now,
                    self.config.execution.max_workflow_history,
                );
                if result.is_ok() {
                    cancelled.push((target.clone(), from));
                    if from == TaskStatus::InProgress {
                        in_flight.push((target, agent));
                    }
                }
            }
            (workflow.session_id.clone(), cancelled, in_flight)
        };
        if cancelled.is_empty() {
            return Err(Error::new(
                ErrorKind::Conflict,
                format!("task {task_id} cannot be cancelled in its current state"),
            )
            .with_context(ErrorContext::new("coordinator", "cancel_task").entity(task_id.as_str())));
        }
        self.persist(&workflow_id);
        for (target, from) in &cancelled {
            self.registry.release(target, None);
            self.emit_transition(
                &workflow_id,
                &session_id,
                target,
                *from,
                TaskStatus::Cancelled,
                reason,
            );
        }
        self.signal_aborts(in_flight).await;
        self.after_task_settled(&workflow_id).await;
        Ok(cancelled.into_iter().map(|(id, _)| id).collect())
    }

    /// Fire cancellation tokens and send cooperative aborts, bounded by the
    /// ack timeout.
    async fn signal_aborts(&self, in_flight: Vec<(TaskId, Option<AgentId>)>) {
        let ack = Duration::from_millis(self.config.execution.cancel_ack_timeout_ms);
        for (task_id, agent_id) in in_flight {
            if let Some(token) = self.running.lock().get(&task_id) {
                token.cancel();
            }
            if let Some(agent_id) = agent_id {
                let abort = self.channel.abort(&agent_id, &task_id);
                if tokio::time::timeout(ack, abort).await.is_err() {
                    warn!(task = %task_id, agent = %agent_id, "abort ack timed out; moving on");
                }
            }
        }
    }

    /// Pause dispatching for a workflow; running tasks keep going.
    pub fn pause_workflow(&self, workflow_id: &WorkflowId) -> Result<(), Error> {
        self.set_workflow_status(workflow_id, WorkflowStatus::Running, WorkflowStatus::Paused)
    }

    /// Resume a paused workflow and re-evaluate its ready set.
    pub async fn resume_workflow(&self, workflow_id: &WorkflowId) -> Result<(), Error> {
        self.set_workflow_status(workflow_id, WorkflowStatus::Paused, WorkflowStatus::Running)?;
        let Some(handle) = self.workflow_handle(workflow_id) else {
            return Ok(());
        };
        let ready = handle.lock().ready_tasks();
        for task_id in ready {
            self.enqueue(workflow_id.clone(), task_id).await;
        }
        Ok(())
    }

    fn set_workflow_status(
        &self,
        workflow_id: &WorkflowId,
        expect: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<(), Error> {
        let handle = self
            .workflow_handle(workflow_id)
            .ok_or_else(|| Error::not_found("workflow", workflow_id))?;
        let now = self.clock.epoch_ms();
        let session_id = {
            let mut workflow = handle.lock();
            if workflow.status != expect {
                return Err(Error::new(
                    ErrorKind::Conflict,
                    format!("workflow is {}, expected {expect}", workflow.status),
                )
                .with_context(
                    ErrorContext::new("coordinator", "set_status")
                        .entity(workflow_id.as_str()),
                ));
            }
            workflow.status = to;
            workflow.session_id.clone()
        };
        self.persist(workflow_id);
        self.emitter.emit(Event::WorkflowStatusChanged {
            workflow_id: workflow_id.clone(),
            session_id,
            status: to,
            timestamp: now,
        });
        Ok(())
    }

    /// Recover persisted workflows at startup.
    ///
    /// `in_progress` tasks demote to `pending` with a
    /// `recovered_from_crash` history entry; ready tasks of running
    /// workflows re-enter the queue.
    pub async fn recover(&self) -> Result<usize, Error> {
        let recovered = self.store.scan().map_err(Error::from)?;
        let count = recovered.len();
        let now = self.clock.epoch_ms();
        for mut workflow in recovered {
            let workflow_id = workflow.workflow_id.clone();
            let stranded: Vec<TaskId> = workflow
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::InProgress)
                .map(|t| t.task_id.clone())
                .collect();
            for task_id in stranded {
                self.demote_to_pending(&mut workflow, &task_id, "recovered_from_crash", now);
            }
            {
                let mut index = self.task_index.lock();
                for task_id in workflow.tasks.keys() {
                    index.insert(task_id.clone(), workflow_id.clone());
                }
            }
            let ready = if workflow.status == WorkflowStatus::Running {
                workflow.ready_tasks()
            } else {
                Vec::new()
            };
            self.save_with_retry(&workflow)?;
            self.workflows
                .write()
                .insert(workflow_id.clone(), Arc::new(Mutex::new(workflow)));
            for task_id in ready {
                self.enqueue(workflow_id.clone(), task_id).await;
            }
        }
        info!(count, "workflow recovery complete");
        Ok(count)
    }

    /// Requeue path for released claims and crash recovery.
    ///
    /// Deliberately bypasses the legal-transition table: the table governs
    /// caller-driven transitions, while this re-queues work the system
    /// itself interrupted.
    fn demote_to_pending(
        &self,
        workflow: &mut Workflow,
        task_id: &TaskId,
        reason: &str,
        now: u64,
    ) {
        let Some(task) = workflow.tasks.get_mut(task_id.as_str()) else {
            return;
        };
        let from = task.status;
        task.status = TaskStatus::Pending;
        task.assigned_agent = None;
        workflow.record_transition(
            TransitionRecord {
                task_id: task_id.clone(),
                from,
                to: TaskStatus::Pending,
                timestamp: now,
                reason: reason.to_string(),
                triggered_by: "coordinator".to_string(),
                is_automated: true,
            },
            self.config.execution.max_workflow_history,
        );
    }

    /// Liveness sweep: delegate to the registry, then return released tasks
    /// to the ready queue.
    pub async fn liveness_sweep(&self) {
        let outcome = self.registry.sweep();
        for task_id in outcome.released_tasks() {
            self.requeue_released(&task_id).await;
        }
        self.retry_pending().await;
    }

    /// Return a task whose claim went away (deregistration, steal) to the
    /// ready queue.
    pub async fn requeue_released(&self, task_id: &TaskId) {
        let now = self.clock.epoch_ms();
        let Ok(workflow_id) = self.owning_workflow(task_id) else {
            return;
        };
        let Some(handle) = self.workflow_handle(&workflow_id) else {
            return;
        };
        let requeue = {
            let mut workflow = handle.lock();
            let running = workflow
                .tasks
                .get(task_id.as_str())
                .is_some_and(|t| t.status == TaskStatus::InProgress);
            if running {
                self.demote_to_pending(&mut workflow, task_id, "claim released", now);
            }
            running && workflow.status == WorkflowStatus::Running
        };
        if requeue {
            self.persist(&workflow_id);
            self.enqueue(workflow_id, task_id.clone()).await;
        }
    }

    /// Retry tasks parked for lack of a qualified agent.
    pub async fn retry_pending(&self) {
        for task in self.registry.take_pending() {
            self.enqueue(task.workflow_id.clone(), task.task_id.clone()).await;
        }
    }

    // -- agent protocol --

    /// `claim`: take a specific task, or the next ready one.
    pub async fn agent_claim(
        &self,
        agent_id: &AgentId,
        task_id: Option<TaskId>,
    ) -> Result<Task, Error> {
        let task_id = match task_id {
            Some(task_id) => task_id,
            None => self
                .next_ready_task()
                .ok_or_else(|| Error::new(ErrorKind::NotFound, "no ready task available"))?,
        };
        let workflow_id = self.owning_workflow(&task_id)?;
        let handle = self
            .workflow_handle(&workflow_id)
            .ok_or_else(|| Error::not_found("workflow", &workflow_id))?;

        // claim first so a racing worker cannot double-assign
        self.registry.claim_for(agent_id, &task_id)?;
        let now = self.clock.epoch_ms();
        let result: Result<(Task, SessionId, TaskStatus), Error> = {
            let mut workflow = handle.lock();
            match workflow.tasks.get(task_id.as_str()).map(|t| t.status) {
                None => Err(Error::not_found("task", &task_id)),
                Some(from) => transition_task(
                    &mut workflow,
                    TransitionRequest {
                        task_id: &task_id,
                        to: TaskStatus::InProgress,
                        reason: "claimed by agent",
                        triggered_by: agent_id.as_str(),
                        is_automated: false,
                    },
                    now,
                    self.config.execution.max_workflow_history,
                )
                .map(|_| {
                    if let Some(task) = workflow.tasks.get_mut(task_id.as_str()) {
                        task.assigned_agent = Some(agent_id.clone());
                    }
                    (
                        workflow.tasks[task_id.as_str()].clone(),
                        workflow.session_id.clone(),
                        from,
                    )
                }),
            }
        };
        match result {
            Ok((task, session_id, from)) => {
                self.persist(&workflow_id);
                self.emit_transition(
                    &workflow_id,
                    &session_id,
                    &task_id,
                    from,
                    TaskStatus::InProgress,
                    "claimed by agent",
                );
                Ok(task)
            }
            Err(e) => {
                self.registry.release(&task_id, None);
                Err(e)
            }
        }
    }

    /// `complete`: success report from an agent.
    pub async fn agent_complete(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
        result: Option<serde_json::Value>,
        files_modified: Vec<String>,
        tests_passed: Option<bool>,
    ) -> Result<(), Error> {
        self.verify_claim(agent_id, task_id)?;
        let outcome = TaskOutcome {
            status: TaskOutcomeStatus::Completed,
            message: "completed by agent".to_string(),
            result,
            files_modified,
            tests_passed,
        };
        self.finish_task(&self.owning_workflow(task_id)?, task_id, agent_id, outcome).await;
        Ok(())
    }

    /// `help`: the agent needs a human; the task parks as blocked.
    pub async fn agent_help(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
        issue: &str,
    ) -> Result<(), Error> {
        self.verify_claim(agent_id, task_id)?;
        let outcome = TaskOutcome {
            status: TaskOutcomeStatus::Blocked,
            message: format!("help requested: {issue}"),
            result: None,
            files_modified: Vec::new(),
            tests_passed: None,
        };
        self.finish_task(&self.owning_workflow(task_id)?, task_id, agent_id, outcome).await;
        Ok(())
    }

    /// `block`: the agent reports an external blocker.
    pub async fn agent_block(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
        blocker_type: &str,
        description: &str,
        suggested_resolution: Option<&str>,
    ) -> Result<(), Error> {
        self.verify_claim(agent_id, task_id)?;
        let mut message = format!("blocked ({blocker_type}): {description}");
        if let Some(resolution) = suggested_resolution {
            message.push_str(&format!("; suggested: {resolution}"));
        }
        let outcome = TaskOutcome {
            status: TaskOutcomeStatus::Blocked,
            message,
            result: None,
            files_modified: Vec::new(),
            tests_passed: None,
        };
        self.finish_task(&self.owning_workflow(task_id)?, task_id, agent_id, outcome).await;
        Ok(())
    }

    /// `heartbeat`: liveness passthrough plus a pending-assignment retry.
    pub async fn agent_heartbeat(
        &self,
        agent_id: &AgentId,
        activity: Option<AgentActivity>,
        progress: Option<u8>,
        expected_duration_ms: Option<u64>,
    ) -> Result<(), Error> {
        self.registry.heartbeat(agent_id, activity, progress, expected_duration_ms)?;
        self.retry_pending().await;
        Ok(())
    }

    // -- accessors --

    pub fn workflow(&self, workflow_id: &WorkflowId) -> Option<Workflow> {
        self.workflow_handle(workflow_id).map(|handle| handle.lock().clone())
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }

    /// Is this ID already used by any live task (counter collision probe)?
    pub fn contains_task_str(&self, task_id: &str) -> bool {
        self.task_index.lock().contains_key(task_id)
    }

    /// Prune terminal workflows idle past the configured TTL.
    pub fn sweep_expired_workflows(&self) -> Vec<WorkflowId> {
        let now = self.clock.epoch_ms();
        let ttl = self.config.storage.workflow_ttl_ms;
        let expired: Vec<WorkflowId> = {
            let workflows = self.workflows.read();
            workflows
                .iter()
                .filter(|(_, handle)| {
                    let workflow = handle.lock();
                    workflow.status.is_terminal()
                        && workflow
                            .end_time
                            .is_some_and(|end| now.saturating_sub(end) >= ttl)
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for workflow_id in &expired {
            if let Some(handle) = self.workflows.write().remove(workflow_id) {
                let task_ids: Vec<TaskId> =
                    handle.lock().tasks.keys().cloned().collect();
                let mut index = self.task_index.lock();
                for task_id in task_ids {
                    index.remove(&task_id);
                }
            }
            self.job_links.lock().remove(workflow_id);
            if let Err(e) = self.store.delete(workflow_id) {
                warn!(workflow = %workflow_id, error = %e, "workflow prune failed");
            }
        }
        expired
    }

    // -- internals --

    fn workflow_handle(&self, workflow_id: &WorkflowId) -> Option<Arc<Mutex<Workflow>>> {
        self.workflows.read().get(workflow_id).cloned()
    }

    fn owning_workflow(&self, task_id: &TaskId) -> Result<WorkflowId, Error> {
        self.task_index
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::not_found("task", task_id))
    }

    fn next_ready_task(&self) -> Option<TaskId> {
        let workflows = self.workflows.read();
        for handle in workflows.values() {
            let workflow = handle.lock();
            if workflow.status != WorkflowStatus::Running {
                continue;
            }
            if let Some(task_id) = workflow.ready_tasks().into_iter().next() {
                return Some(task_id);
            }
        }
        None
    }

    fn verify_claim(&self, agent_id: &AgentId, task_id: &TaskId) -> Result<(), Error> {
        match self.registry.claim_of(task_id) {
            Some(claim) if &claim.agent_id == agent_id => Ok(()),
            Some(claim) => Err(Error::new(
                ErrorKind::PermissionDenied,
                format!("task {task_id} is claimed by {}", claim.agent_id),
            )
            .with_context(
                ErrorContext::new("coordinator", "verify_claim")
                    .entity(task_id.as_str())
                    .entity(agent_id.as_str()),
            )),
            None => Err(Error::new(
                ErrorKind::Conflict,
                format!("task {task_id} has no active claim"),
            )
            .with_context(
                ErrorContext::new("coordinator", "verify_claim").entity(task_id.as_str()),
            )),
        }
    }

    /// Nudge the linked job's progress/message (never regresses).
    async fn touch_job(
        &self,
        workflow_id: &WorkflowId,
        progress: Option<u8>,
        message: Option<&str>,
    ) {
        let job_id = self.job_links.lock().get(workflow_id).cloned();
        let Some(job_id) = job_id else {
            return;
        };
        let current = match self.jobs.get_job(&job_id) {
            Ok(job) => job,
            Err(_) => return,
        };
        if current.status.is_terminal() {
            return;
        }
        let patch = JobPatch {
            status: (current.status == JobStatus::Pending).then_some(JobStatus::Running),
            progress: progress.filter(|p| *p > current.progress),
            message: message.map(|m| m.to_string()),
            result: None,
        };
        if let Err(e) = self.jobs.update_job(&job_id, patch) {
            warn!(job = %job_id, error = %e, "job progress update rejected");
        }
    }

    fn emit_transition(
        &self,
        workflow_id: &WorkflowId,
        session_id: &SessionId,
        task_id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
        reason: &str,
    ) {
        self.emitter.emit(Event::TaskTransition {
            workflow_id: workflow_id.clone(),
            session_id: session_id.clone(),
            task_id: task_id.clone(),
            from,
            to,
            reason: reason.to_string(),
            timestamp: self.clock.epoch_ms(),
        });
    }

    /// Persist a workflow snapshot (lock, clone, release, write).
    fn persist(&self, workflow_id: &WorkflowId) {
        let Some(handle) = self.workflow_handle(workflow_id) else {
            return;
        };
        let snapshot = handle.lock().clone();
        if let Err(e) = self.save_with_retry(&snapshot) {
            error!(workflow = %workflow_id, error = %e, "workflow persist failed; halting workflow");
            handle.lock().status = WorkflowStatus::Failed;
        }
    }

    /// State-store writes retry once, then surface.
    fn save_with_retry(&self, workflow: &Workflow) -> Result<(), Error> {
        match self.store.save(workflow) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(workflow = %workflow.workflow_id, error = %first, "workflow save failed; retrying");
                self.store.save(workflow).map_err(Error::from)
            }
        }
    }

    /// Periodic snapshot of all live workflows (the backup interval).
    pub fn backup_all(&self) {
        let handles: Vec<Arc<Mutex<Workflow>>> =
            self.workflows.read().values().cloned().collect();
        for handle in handles {
            let snapshot = handle.lock().clone();
            if let Err(e) = self.save_with_retry(&snapshot) {
                warn!(workflow = %snapshot.workflow_id, error = %e, "periodic backup failed");
            }
        }
    }
}

/// Terminal summary blob attached to the job result.
fn task_summary(workflow: &Workflow) -> serde_json::Value {
    let tasks: Vec<serde_json::Value> = workflow
        .tasks
        .values()
        .map(|t| {
            serde_json::json!({
                "task_id": t.task_id,
                "title": t.title,
                "status": t.status,
            })
        })
        .collect();
    serde_json::json!({
        "workflow_id": workflow.workflow_id,
        "tasks": tasks,
    })
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Shared harness: a full engine stack over a temp state dir, with the
//! execution loop running and a scripted agent channel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use maestro_core::config::OrchestratorConfig;
use maestro_core::{AgentId, FakeClock, Task, TaskPriority, TaskType};
use maestro_engine::{
    AgentRegistry, Coordinator, EventEmitter, JobController, RegisterAgent, ScriptedChannel,
};
use maestro_storage::{AgentRegistryStore, WorkflowStore};
use tokio_util::sync::CancellationToken;

pub struct Stack {
    pub clock: FakeClock,
    pub emitter: Arc<EventEmitter<FakeClock>>,
    pub jobs: Arc<JobController<FakeClock>>,
    pub registry: Arc<AgentRegistry<FakeClock>>,
    pub coordinator: Arc<Coordinator<FakeClock>>,
    pub channel: Arc<ScriptedChannel>,
    pub shutdown: CancellationToken,
    _dir: tempfile::TempDir,
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Build the stack and spawn the execution loop.
pub fn stack() -> Stack {
    stack_with(OrchestratorConfig::default())
}

pub fn stack_with(config: OrchestratorConfig) -> Stack {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = FakeClock::new();
    let emitter = Arc::new(EventEmitter::new(clock.clone(), 1024));
    let jobs = Arc::new(JobController::new(
        config.poll.clone(),
        clock.clone(),
        Arc::clone(&emitter),
    ));
    let registry = Arc::new(AgentRegistry::new(
        config.heartbeat.clone(),
        clock.clone(),
        Arc::clone(&emitter),
        AgentRegistryStore::new(dir.path().join("agents.json")),
    ));
    let channel = Arc::new(ScriptedChannel::new());
    let (coordinator, queue_rx) = Coordinator::new(
        config,
        clock.clone(),
        Arc::clone(&emitter),
        Arc::clone(&jobs),
        Arc::clone(&registry),
        Arc::clone(&channel) as _,
        WorkflowStore::new(dir.path().join("workflows")),
    );
    let shutdown = CancellationToken::new();
    tokio::spawn(Arc::clone(&coordinator).run(queue_rx, shutdown.clone()));
    Stack { clock, emitter, jobs, registry, coordinator, channel, shutdown, _dir: dir }
}

/// Register an agent with the given capabilities.
pub fn register_agent(stack: &Stack, id: &str, capabilities: &[&str], max: usize) {
    stack
        .registry
        .register(RegisterAgent {
            agent_id: AgentId::new(id),
            name: id.to_string(),
            capabilities: capabilities.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            max_concurrent_tasks: max,
        })
        .expect("register agent");
}

/// A task spec'd the way the scenarios need it.
pub fn task(id: &str, task_type: TaskType, required: &[&str]) -> Task {
    maestro_core::TaskBuilder::default()
        .task_id(id)
        .task_type(task_type)
        .priority(TaskPriority::Medium)
        .required_capabilities(required.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
        .build()
}

/// Poll `predicate` until it holds or a wall-clock deadline expires.
pub async fn wait_until(description: &str, predicate: impl Fn() -> bool) {
    let deadline = Duration::from_secs(5);
    let result = tokio::time::timeout(deadline, async {
        loop {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for: {description}");
}

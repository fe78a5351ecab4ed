// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Daemon lifecycle: startup, recovery, shutdown plumbing.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use maestro_core::{ConfigError, SystemClock};
use maestro_engine::{AgentRegistry, Coordinator, EventEmitter, JobController, QueuedTask};
use maestro_storage::{AgentRegistryStore, CounterStore, JobStore, WorkflowStore};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::channel::ProtocolChannel;
use crate::config::DaemonConfig;

/// Broadcast capacity for the event stream.
const EVENT_CAPACITY: usize = 1024;

/// Errors during daemon startup/shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory (no home)")]
    NoStateDir,

    #[error("another daemon already holds the lock")]
    AlreadyRunning,

    #[error("config error in {0:?}: {1}")]
    Config(PathBuf, ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] maestro_storage::StorageError),

    #[error(transparent)]
    Engine(#[from] maestro_core::Error),
}

/// Shared daemon services, one instance per process.
pub struct DaemonState {
    pub config: DaemonConfig,
    pub clock: SystemClock,
    pub emitter: Arc<EventEmitter<SystemClock>>,
    pub jobs: Arc<JobController<SystemClock>>,
    pub registry: Arc<AgentRegistry<SystemClock>>,
    pub coordinator: Arc<Coordinator<SystemClock>>,
    pub counters: Arc<CounterStore>,
    pub job_store: Arc<JobStore>,
    pub start_time: Instant,
    // NOTE(lifetime): held to maintain the exclusive PID lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl DaemonState {
    /// Current epoch milliseconds from the daemon clock.
    pub fn clock_ms(&self) -> u64 {
        use maestro_core::Clock;
        self.clock.epoch_ms()
    }
}

/// Everything `main` needs after startup.
pub struct StartupResult {
    pub daemon: Arc<DaemonState>,
    pub listener: UnixListener,
    pub queue_rx: mpsc::Receiver<QueuedTask>,
}

/// Bring the daemon up: lock, build services, recover persisted state,
/// bind the socket.
pub async fn startup(config: DaemonConfig) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config)?;

    let clock = SystemClock::new();
    let emitter = Arc::new(EventEmitter::new(clock.clone(), EVENT_CAPACITY));
    let jobs = Arc::new(JobController::new(
        config.engine.poll.clone(),
        clock.clone(),
        Arc::clone(&emitter),
    ));
    let registry = Arc::new(AgentRegistry::new(
        config.engine.heartbeat.clone(),
        clock.clone(),
        Arc::clone(&emitter),
        AgentRegistryStore::new(&config.agents_path),
    ));
    let channel = Arc::new(ProtocolChannel::new(Arc::clone(&emitter), clock.clone()));
    let (coordinator, queue_rx) = Coordinator::new(
        config.engine.clone(),
        clock.clone(),
        Arc::clone(&emitter),
        Arc::clone(&jobs),
        Arc::clone(&registry),
        channel,
        WorkflowStore::new(&config.workflows_dir),
    );
    let counters =
        Arc::new(CounterStore::open(&config.counters_path, config.engine.storage.id_retry_limit)?);
    let job_store = Arc::new(JobStore::new(&config.jobs_dir));

    // recovery: agents first (capacity), then jobs, then workflows
    let agents = registry.restore()?;
    let job_snapshots = job_store.scan()?;
    jobs.restore(job_snapshots);
    let workflows = coordinator.recover().await?;
    info!(agents, workflows, "state recovered");

    // stale socket from a crashed process
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    info!(socket = %config.socket_path.display(), "daemon listening");

    let daemon = Arc::new(DaemonState {
        config,
        clock,
        emitter,
        jobs,
        registry,
        coordinator,
        counters,
        job_store,
        start_time: Instant::now(),
        lock_file,
    });
    Ok(StartupResult { daemon, listener, queue_rx })
}

fn acquire_lock(config: &DaemonConfig) -> Result<File, LifecycleError> {
    let lock_file = File::create(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| LifecycleError::AlreadyRunning)?;
    if let Err(e) = std::fs::write(&config.lock_path, format!("{}\n", std::process::id())) {
        warn!(error = %e, "could not record PID in lock file");
    }
    Ok(lock_file)
}

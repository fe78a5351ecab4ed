// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Background maintenance: liveness sweep, TTL pruning, periodic snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::lifecycle::DaemonState;

/// Heartbeat/claim sweep plus pending-assignment retries.
pub async fn liveness_loop(daemon: Arc<DaemonState>, shutdown: CancellationToken) {
    let interval = Duration::from_millis(daemon.config.engine.heartbeat.sweep_interval_ms);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        daemon.coordinator.liveness_sweep().await;
    }
}

/// Periodic snapshots of jobs and workflows, plus TTL garbage collection.
pub async fn persistence_loop(daemon: Arc<DaemonState>, shutdown: CancellationToken) {
    let interval = Duration::from_millis(daemon.config.engine.storage.backup_interval_ms);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        daemon.coordinator.backup_all();
        for job in daemon.jobs.snapshot() {
            if let Err(e) = daemon.job_store.save(&job) {
                warn!(job = %job.job_id, error = %e, "job snapshot failed");
            }
        }
        for job_id in daemon.jobs.sweep_expired(daemon.config.engine.storage.job_ttl_ms) {
            if let Err(e) = daemon.job_store.delete(&job_id) {
                warn!(job = %job_id, error = %e, "job snapshot prune failed");
            }
        }
        daemon.coordinator.sweep_expired_workflows();
    }
}

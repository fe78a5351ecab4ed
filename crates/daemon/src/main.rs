// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! maestrod: the maestro orchestration daemon.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use maestro_daemon::{listener, startup, sweeps, DaemonConfig};

fn main() -> ExitCode {
    let config = match DaemonConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("maestrod: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("maestrod: cannot create {}: {e}", config.state_dir.display());
        return ExitCode::FAILURE;
    }

    let file_appender = tracing_appender::rolling::never(&config.state_dir, "daemon.log");
    let (writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "tokio runtime failed to start");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon exited with error");
            eprintln!("maestrod: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: DaemonConfig) -> Result<(), maestro_daemon::LifecycleError> {
    let startup_result = startup(config).await?;
    let daemon = startup_result.daemon;
    let shutdown = CancellationToken::new();

    let execution = tokio::spawn(
        std::sync::Arc::clone(&daemon.coordinator)
            .run(startup_result.queue_rx, shutdown.clone()),
    );
    let accept = tokio::spawn(listener::run(
        std::sync::Arc::clone(&daemon),
        startup_result.listener,
        shutdown.clone(),
    ));
    let liveness = tokio::spawn(sweeps::liveness_loop(
        std::sync::Arc::clone(&daemon),
        shutdown.clone(),
    ));
    let persistence = tokio::spawn(sweeps::persistence_loop(
        std::sync::Arc::clone(&daemon),
        shutdown.clone(),
    ));
    info!("maestrod ready");

    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received; shutting down");
            shutdown.cancel();
        }
    }

    // final snapshot before exit
    daemon.coordinator.backup_all();
    for job in daemon.jobs.snapshot() {
        let _ = daemon.job_store.save(&job);
    }
    let _ = std::fs::remove_file(&daemon.config.socket_path);

    for handle in [execution, accept, liveness, persistence] {
        let _ = handle.await;
    }
    info!("maestrod stopped");
    Ok(())
}

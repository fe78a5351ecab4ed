// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Daemon configuration: state-dir resolution and config file loading.

use std::path::PathBuf;

use maestro_core::{ConfigError, OrchestratorConfig};

use crate::lifecycle::LifecycleError;

/// Protocol version reported in handshakes and status.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory:
/// `MAESTRO_STATE_DIR` > `XDG_STATE_HOME/maestro` > `~/.local/state/maestro`
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MAESTRO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("maestro"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/maestro"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Full daemon configuration: engine tunables plus process paths.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub engine: OrchestratorConfig,
    /// Root state directory
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to ID counter document
    pub counters_path: PathBuf,
    /// Path to the agent registry document
    pub agents_path: PathBuf,
    /// Directory of per-workflow documents
    pub workflows_dir: PathBuf,
    /// Directory of job snapshots
    pub jobs_dir: PathBuf,
}

impl DaemonConfig {
    /// Load configuration, reading `maestro.toml` from the state dir when
    /// present (path overridable via `MAESTRO_CONFIG`).
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let config_path = std::env::var("MAESTRO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| state_dir.join("maestro.toml"));
        let engine = match std::fs::read_to_string(&config_path) {
            Ok(text) => OrchestratorConfig::from_toml(&text)
                .map_err(|e| LifecycleError::Config(config_path.clone(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = OrchestratorConfig::default();
                config
                    .validate()
                    .map_err(|e| LifecycleError::Config(config_path.clone(), e))?;
                config
            }
            Err(e) => return Err(LifecycleError::Io(e)),
        };
        Ok(Self::with_engine(state_dir, engine))
    }

    /// Assemble paths for a given state dir and engine config.
    pub fn with_engine(state_dir: PathBuf, engine: OrchestratorConfig) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            counters_path: state_dir.join("counters.json"),
            agents_path: state_dir.join("agents.json"),
            workflows_dir: state_dir.join("workflows"),
            jobs_dir: state_dir.join("jobs"),
            state_dir,
            engine,
        }
    }
}

/// Surface a config error with the file that caused it.
pub fn describe_config_error(path: &std::path::Path, error: &ConfigError) -> String {
    format!("{}: {error}", path.display())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

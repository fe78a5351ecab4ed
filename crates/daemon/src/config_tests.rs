// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use maestro_core::OrchestratorConfig;

#[test]
fn paths_hang_off_the_state_dir() {
    let config = DaemonConfig::with_engine("/tmp/m-state".into(), OrchestratorConfig::default());
    assert_eq!(config.socket_path, PathBuf::from("/tmp/m-state/daemon.sock"));
    assert_eq!(config.counters_path, PathBuf::from("/tmp/m-state/counters.json"));
    assert_eq!(config.workflows_dir, PathBuf::from("/tmp/m-state/workflows"));
    assert_eq!(config.jobs_dir, PathBuf::from("/tmp/m-state/jobs"));
    assert_eq!(config.agents_path, PathBuf::from("/tmp/m-state/agents.json"));
}

#[test]
fn describe_config_error_names_the_file() {
    let error = maestro_core::ConfigError::InvalidValue {
        key: "poll.base_interval_ms",
        reason: "must be positive".into(),
    };
    let text = describe_config_error(std::path::Path::new("/etc/maestro.toml"), &error);
    assert!(text.contains("/etc/maestro.toml"));
    assert!(text.contains("poll.base_interval_ms"));
}

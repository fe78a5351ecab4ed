// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Typed process configuration.
//!
//! One config tree drives every tunable in the daemon. Unknown keys are
//! rejected at parse time (`deny_unknown_fields`); out-of-range values are
//! rejected by [`OrchestratorConfig::validate`], which names the offending
//! key in the error.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration load/validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parse failure, including unknown-key rejections from serde.
    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid config value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

macro_rules! default_fns {
    ($( $name:ident : $ty:ty = $value:expr; )+) => {
        $( fn $name() -> $ty { $value } )+
    };
}

default_fns! {
    d_base_interval_ms: u64 = 1_000;
    d_min_interval_ms: u64 = 250;
    d_max_interval_ms: u64 = 30_000;
    d_max_delay_ms: u64 = 30_000;
    d_fast_poll_threshold_ms: u64 = 500;
    d_shrink_floor_ms: u64 = 200;
    d_heartbeat_base_ms: u64 = 30_000;
    d_grace_period_ms: u64 = 60_000;
    d_max_grace_periods: u32 = 3;
    d_critical_extension_ms: u64 = 300_000;
    d_claim_ttl_ms: u64 = 120_000;
    d_max_agent_concurrency: usize = 10;
    d_max_concurrent_executions: usize = 5;
    d_execution_timeout_ms: u64 = 300_000;
    d_agent_comm_timeout_ms: u64 = 30_000;
    d_store_write_timeout_ms: u64 = 10_000;
    d_cancel_ack_timeout_ms: u64 = 10_000;
    d_queue_capacity: usize = 256;
    d_retry_delay_ms: u64 = 2_000;
    d_max_workflow_history: usize = 100;
    d_max_dependency_depth: usize = 10;
    d_max_chain_length: usize = 20;
    d_id_retry_limit: u32 = 1_000;
    d_job_ttl_ms: u64 = 3_600_000;
    d_workflow_ttl_ms: u64 = 86_400_000;
    d_backup_interval_ms: u64 = 60_000;
    d_sweep_interval_ms: u64 = 5_000;
}

/// Poll controller tunables (§ job/poll controller).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Base pull interval handed to compliant pollers.
    #[serde(default = "d_base_interval_ms")]
    pub base_interval_ms: u64,
    /// Two polls inside this window count as a rate-limit violation.
    #[serde(default = "d_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "d_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Clamp for rate-limit backoff waits.
    #[serde(default = "d_max_delay_ms")]
    pub max_delay_ms: u64,
    /// A poll is "fast" when the job was updated more recently than this.
    #[serde(default = "d_fast_poll_threshold_ms")]
    pub fast_poll_threshold_ms: u64,
    /// Floor for the shrink-on-progress interval.
    #[serde(default = "d_shrink_floor_ms")]
    pub shrink_floor_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: d_base_interval_ms(),
            min_interval_ms: d_min_interval_ms(),
            max_interval_ms: d_max_interval_ms(),
            max_delay_ms: d_max_delay_ms(),
            fast_poll_threshold_ms: d_fast_poll_threshold_ms(),
            shrink_floor_ms: d_shrink_floor_ms(),
        }
    }
}

/// Heartbeat and claim tunables (§ agent orchestrator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    #[serde(default = "d_heartbeat_base_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "d_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "d_max_grace_periods")]
    pub max_grace_periods: u32,
    /// Fixed extension for workflow-critical activities.
    #[serde(default = "d_critical_extension_ms")]
    pub workflow_critical_extension_ms: u64,
    #[serde(default = "d_claim_ttl_ms")]
    pub claim_ttl_ms: u64,
    /// Upper clamp for a registering agent's `max_concurrent_tasks`.
    #[serde(default = "d_max_agent_concurrency")]
    pub max_agent_concurrency: usize,
    /// How often the monitor sweeps for deadlines and expired claims.
    #[serde(default = "d_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: d_heartbeat_base_ms(),
            grace_period_ms: d_grace_period_ms(),
            max_grace_periods: d_max_grace_periods(),
            workflow_critical_extension_ms: d_critical_extension_ms(),
            claim_ttl_ms: d_claim_ttl_ms(),
            max_agent_concurrency: d_max_agent_concurrency(),
            sweep_interval_ms: d_sweep_interval_ms(),
        }
    }
}

/// Execution queue and deadline tunables (§ lifecycle coordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    #[serde(default = "d_max_concurrent_executions")]
    pub max_concurrent_executions: usize,
    #[serde(default = "d_execution_timeout_ms")]
    pub execution_timeout_ms: u64,
    #[serde(default = "d_agent_comm_timeout_ms")]
    pub agent_comm_timeout_ms: u64,
    #[serde(default = "d_cancel_ack_timeout_ms")]
    pub cancel_ack_timeout_ms: u64,
    /// Bound on the ready queue; producers block when full.
    #[serde(default = "d_queue_capacity")]
    pub queue_capacity: usize,
    /// Requeue delay when no agent qualifies for a ready task.
    #[serde(default = "d_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "d_max_workflow_history")]
    pub max_workflow_history: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: d_max_concurrent_executions(),
            execution_timeout_ms: d_execution_timeout_ms(),
            agent_comm_timeout_ms: d_agent_comm_timeout_ms(),
            cancel_ack_timeout_ms: d_cancel_ack_timeout_ms(),
            queue_capacity: d_queue_capacity(),
            retry_delay_ms: d_retry_delay_ms(),
            max_workflow_history: d_max_workflow_history(),
        }
    }
}

/// Dependency validator thresholds (§ dependency validator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    #[serde(default = "d_max_dependency_depth")]
    pub max_dependency_depth: usize,
    #[serde(default = "d_max_chain_length")]
    pub max_chain_length: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_dependency_depth: d_max_dependency_depth(),
            max_chain_length: d_max_chain_length(),
        }
    }
}

/// Storage tunables (§ state store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "d_store_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "d_id_retry_limit")]
    pub id_retry_limit: u32,
    #[serde(default = "d_job_ttl_ms")]
    pub job_ttl_ms: u64,
    #[serde(default = "d_workflow_ttl_ms")]
    pub workflow_ttl_ms: u64,
    /// Interval between periodic workflow/job snapshots.
    #[serde(default = "d_backup_interval_ms")]
    pub backup_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: d_store_write_timeout_ms(),
            id_retry_limit: d_id_retry_limit(),
            job_ttl_ms: d_job_ttl_ms(),
            workflow_ttl_ms: d_workflow_ttl_ms(),
            backup_interval_ms: d_backup_interval_ms(),
        }
    }
}

/// The uniform configuration object driving all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Root state directory; empty means "resolve at startup".
    #[serde(default)]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl OrchestratorConfig {
    /// Parse a TOML document; unknown keys are rejected with the key name.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::InvalidValue { key, reason: "must be positive".into() });
            }
            Ok(())
        }

        positive("poll.base_interval_ms", self.poll.base_interval_ms)?;
        positive("poll.min_interval_ms", self.poll.min_interval_ms)?;
        positive("poll.max_interval_ms", self.poll.max_interval_ms)?;
        positive("poll.max_delay_ms", self.poll.max_delay_ms)?;
        positive("poll.shrink_floor_ms", self.poll.shrink_floor_ms)?;
        if self.poll.max_interval_ms < self.poll.base_interval_ms {
            return Err(ConfigError::InvalidValue {
                key: "poll.max_interval_ms",
                reason: "must be >= poll.base_interval_ms".into(),
            });
        }
        positive("heartbeat.base_interval_ms", self.heartbeat.base_interval_ms)?;
        positive("heartbeat.grace_period_ms", self.heartbeat.grace_period_ms)?;
        positive("heartbeat.claim_ttl_ms", self.heartbeat.claim_ttl_ms)?;
        positive("heartbeat.sweep_interval_ms", self.heartbeat.sweep_interval_ms)?;
        positive("heartbeat.max_agent_concurrency", self.heartbeat.max_agent_concurrency as u64)?;
        positive(
            "execution.max_concurrent_executions",
            self.execution.max_concurrent_executions as u64,
        )?;
        positive("execution.execution_timeout_ms", self.execution.execution_timeout_ms)?;
        positive("execution.queue_capacity", self.execution.queue_capacity as u64)?;
        positive("execution.max_workflow_history", self.execution.max_workflow_history as u64)?;
        positive("graph.max_dependency_depth", self.graph.max_dependency_depth as u64)?;
        positive("graph.max_chain_length", self.graph.max_chain_length as u64)?;
        positive("storage.write_timeout_ms", self.storage.write_timeout_ms)?;
        positive("storage.id_retry_limit", self.storage.id_retry_limit as u64)?;
        Ok(())
    }

    pub fn claim_ttl(&self) -> Duration {
        Duration::from_millis(self.heartbeat.claim_ttl_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution.execution_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

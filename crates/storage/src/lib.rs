// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-storage: durable on-disk state.
//!
//! Every document is JSON written via one atomic primitive (temp file +
//! fsync + rename), so a crash never leaves a half-written record. Layout
//! under the state dir:
//!
//! - `counters.json` — ID counters
//! - `workflows/<workflowId>.json` — per-workflow state
//! - `jobs/<jobId>.json` — job record snapshots
//! - `agents.json` — agent registry

pub mod atomic;
mod agents;
mod counters;
mod error;
mod jobs;
mod workflows;

pub use agents::AgentRegistryStore;
pub use atomic::{load_json, write_json_atomic};
pub use counters::CounterStore;
pub use error::StorageError;
pub use jobs::JobStore;
pub use workflows::WorkflowStore;

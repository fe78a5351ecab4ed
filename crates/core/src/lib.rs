// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-core: data model and shared services for the maestro orchestration daemon

pub mod macros;

pub mod agent;
pub mod clock;
pub mod config;
pub mod dependency;
pub mod error;
pub mod event;
pub mod id;
pub mod job;
pub mod poll;
pub mod task;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentActivity, AgentStatus, Claim};
#[cfg(any(test, feature = "test-support"))]
pub use agent::AgentBuilder;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, OrchestratorConfig};
pub use dependency::{Dependency, DependencyType};
pub use error::{Error, ErrorContext, ErrorKind};
pub use event::Event;
pub use id::{
    AgentId, DependencyId, EpicId, JobId, NameValidation, ProjectId, SessionId, TaskId,
    WorkflowId,
};
pub use job::{JobRecord, JobStatus, TransportHint};
pub use poll::{PollRecord, RateLimit};
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use task::{Task, TaskPriority, TaskStatus, TaskType, TransitionRecord};
pub use workflow::{Workflow, WorkflowPhase, WorkflowStatus};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-engine: the orchestration controllers.
//!
//! Three coupled services over the shared data model:
//!
//! - [`JobController`] — job records, transport-adaptive poll intervals,
//!   rate limiting with exponential backoff
//! - [`AgentRegistry`] — agent registration, capability scoring, claims,
//!   workflow-aware heartbeat liveness
//! - [`Coordinator`] — workflow/task lifecycle, the execution queue, and
//!   cancellation propagation
//!
//! Locking discipline: no lock is held across I/O. Mutations are
//! read-under-lock, release, perform I/O, re-acquire, commit.

mod channel;
mod coordinator;
mod events;
mod lifecycle;
mod poll;
mod registry;

pub use channel::{AgentChannel, TaskOutcome, TaskOutcomeStatus};
#[cfg(any(test, feature = "test-support"))]
pub use channel::ScriptedChannel;
pub use coordinator::{Coordinator, QueuedTask, SubmitOutcome};
pub use events::EventEmitter;
pub use lifecycle::{transition_task, TransitionRequest};
pub use poll::{JobController, PollResponse};
pub use registry::{AgentRegistry, Assignment, RegisterAgent, SweepOutcome};

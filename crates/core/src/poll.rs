// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Per-(session, job) polling throttle state.
//!
//! Runtime-only: never persisted, repopulates naturally as callers poll.

use crate::id::{JobId, SessionId};
use serde::{Deserialize, Serialize};

/// Rate-limit verdict attached to an over-eager poll response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub wait_time_ms: u64,
    pub next_allowed_at: u64,
}

/// Throttling state for one `(session, job)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    pub session_id: SessionId,
    pub job_id: JobId,
    pub last_poll_at: u64,
    /// Polls that arrived while the job had been updated < 500 ms ago.
    pub consecutive_fast_polls: u32,
    /// Rate-limit violations since the last compliant poll.
    pub violations: u32,
    pub next_allowed_at: u64,
    /// Progress value seen by the previous poll, for shrink-on-progress.
    pub last_seen_progress: u8,
    /// waitTime handed out for the most recent violation.
    pub last_wait_time_ms: u64,
}

impl PollRecord {
    pub fn new(session_id: SessionId, job_id: JobId, now_ms: u64) -> Self {
        Self {
            session_id,
            job_id,
            last_poll_at: now_ms,
            consecutive_fast_polls: 0,
            violations: 0,
            next_allowed_at: 0,
            last_seen_progress: 0,
            last_wait_time_ms: 0,
        }
    }

    /// Reset throttling after a compliant poll or terminal status.
    pub fn reset_violations(&mut self) {
        self.violations = 0;
        self.last_wait_time_ms = 0;
        self.next_allowed_at = 0;
    }
}

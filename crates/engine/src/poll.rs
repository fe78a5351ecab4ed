// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Job controller: records, transport-adaptive poll intervals, rate limiter.
//!
//! Job and poll tables live behind a reader-writer lock; pull polls take the
//! write side only for their own throttle record.

use std::collections::HashMap;
use std::sync::Arc;

use maestro_core::config::PollConfig;
use maestro_core::job::JobPatch;
use maestro_core::{
    Clock, Error, ErrorContext, ErrorKind, Event, JobId, JobRecord, PollRecord, RateLimit,
    SessionId, TransportHint,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::events::EventEmitter;

/// Response to a `get_job_result` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub job: JobRecord,
    pub poll_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

/// Violation counters clamp here; backoff saturates at `max_delay` long
/// before.
const MAX_VIOLATIONS: u32 = 16;

#[derive(Default)]
struct JobTable {
    jobs: HashMap<JobId, JobRecord>,
    polls: HashMap<(SessionId, JobId), PollRecord>,
}

/// Owns job status transitions and poll throttling.
pub struct JobController<C: Clock> {
    config: PollConfig,
    clock: C,
    emitter: Arc<EventEmitter<C>>,
    table: RwLock<JobTable>,
}

impl<C: Clock> JobController<C> {
    pub fn new(config: PollConfig, clock: C, emitter: Arc<EventEmitter<C>>) -> Self {
        Self { config, clock, emitter, table: RwLock::new(JobTable::default()) }
    }

    /// Allocate a job. Returns the record and the first poll interval
    /// (zero on push transport).
    pub fn start_job(
        &self,
        session_id: SessionId,
        transport: TransportHint,
        tool_name: &str,
    ) -> (JobRecord, u64) {
        let now = self.clock.epoch_ms();
        let job = JobRecord::new(JobId::generate(), session_id, tool_name, transport, now);
        self.table.write().jobs.insert(job.job_id.clone(), job.clone());
        self.emitter.emit(Event::JobStarted { job: job.clone(), timestamp: now });
        let interval = match transport {
            TransportHint::Push => 0,
            TransportHint::Pull => self.config.base_interval_ms,
        };
        (job, interval)
    }

    /// Apply a patch and publish the progress event.
    pub fn update_job(&self, job_id: &JobId, patch: JobPatch) -> Result<JobRecord, Error> {
        let now = self.clock.epoch_ms();
        let updated = {
            let mut table = self.table.write();
            let job = table
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| self.not_found(job_id))?;
            job.apply(patch, now)?;
            job.clone()
        };
        self.emitter.emit(Event::JobProgress { job: updated.clone(), timestamp: now });
        if updated.status.is_terminal() {
            self.emitter.forget_job(job_id);
        }
        Ok(updated)
    }

    /// Read a job record without touching throttle state (push fallback and
    /// internal callers).
    pub fn get_job(&self, job_id: &JobId) -> Result<JobRecord, Error> {
        self.table
            .read()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| self.not_found(job_id))
    }

    /// The polling read: returns the record, the next interval, and a
    /// rate-limit verdict when the caller polled too fast.
    pub fn get_job_result(
        &self,
        session_id: &SessionId,
        job_id: &JobId,
    ) -> Result<PollResponse, Error> {
        let now = self.clock.epoch_ms();
        let job = {
            let table = self.table.read();
            let job = table.jobs.get(job_id).ok_or_else(|| self.not_found(job_id))?;
            if &job.session_id != session_id {
                return Err(Error::new(
                    ErrorKind::PermissionDenied,
                    format!("job {job_id} belongs to another session"),
                )
                .with_context(
                    ErrorContext::new("poll", "get_job_result")
                        .entity(job_id.as_str())
                        .entity(session_id.as_str()),
                ));
            }
            job.clone()
        };

        let mut table = self.table.write();
        let record = table
            .polls
            .entry((session_id.clone(), job_id.clone()))
            .or_insert_with(|| PollRecord::new(session_id.clone(), job_id.clone(), 0));

        let elapsed_since_poll = now.saturating_sub(record.last_poll_at);
        let first_poll = record.last_poll_at == 0;
        record.last_poll_at = now;

        // Rate limiting runs before interval shaping.
        let rate_limit = if !first_poll
            && !job.status.is_terminal()
            && elapsed_since_poll < self.config.min_interval_ms
        {
            let wait = (self.config.base_interval_ms << record.violations.min(MAX_VIOLATIONS))
                .min(self.config.max_delay_ms);
            record.violations = (record.violations + 1).min(MAX_VIOLATIONS);
            record.last_wait_time_ms = wait;
            record.next_allowed_at = now + wait;
            Some(RateLimit { wait_time_ms: wait, next_allowed_at: record.next_allowed_at })
        } else {
            record.reset_violations();
            None
        };

        let poll_interval_ms = self.poll_interval(&job, record, now);
        record.last_seen_progress = job.progress;
        Ok(PollResponse { job, poll_interval_ms, rate_limit })
    }

    /// Adaptive interval shaping (pull transport only).
    fn poll_interval(&self, job: &JobRecord, record: &mut PollRecord, now: u64) -> u64 {
        if job.status.is_terminal() {
            record.consecutive_fast_polls = 0;
            return 0;
        }
        if job.transport == TransportHint::Push {
            return 0;
        }
        let since_update = now.saturating_sub(job.updated_at);
        if since_update < self.config.fast_poll_threshold_ms {
            let k = record.consecutive_fast_polls.min(16);
            record.consecutive_fast_polls += 1;
            return (self.config.base_interval_ms << k).min(self.config.max_interval_ms);
        }
        record.consecutive_fast_polls = 0;
        if job.progress > record.last_seen_progress {
            return (self.config.base_interval_ms / 2).max(self.config.shrink_floor_ms);
        }
        self.config.base_interval_ms
    }

    /// Load job snapshots recovered at startup.
    pub fn restore(&self, jobs: Vec<JobRecord>) {
        let mut table = self.table.write();
        for job in jobs {
            table.jobs.entry(job.job_id.clone()).or_insert(job);
        }
    }

    /// Snapshot every live record for periodic persistence.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.table.read().jobs.values().cloned().collect()
    }

    /// Drop terminal jobs idle past `ttl_ms`, with their poll records.
    /// Returns the pruned IDs so the store can delete snapshots.
    pub fn sweep_expired(&self, ttl_ms: u64) -> Vec<JobId> {
        let now = self.clock.epoch_ms();
        let mut table = self.table.write();
        let expired: Vec<JobId> = table
            .jobs
            .values()
            .filter(|j| j.status.is_terminal() && now.saturating_sub(j.updated_at) >= ttl_ms)
            .map(|j| j.job_id.clone())
            .collect();
        for id in &expired {
            table.jobs.remove(id);
        }
        table.polls.retain(|(_, job_id), _| !expired.contains(job_id));
        expired
    }

    fn not_found(&self, job_id: &JobId) -> Error {
        Error::not_found("job", job_id).with_context(
            ErrorContext::new("poll", "lookup").entity(job_id.as_str()),
        )
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Event emission with duplicate-progress suppression.
//!
//! Events fan out through a tokio broadcast channel; the transport layer
//! subscribes per push connection and filters by session. Back-to-back
//! duplicate progress frames within the suppression window are dropped per
//! job; state-change events always go through.

use std::collections::HashMap;

use maestro_core::{Clock, Event, JobId};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Suppression window for duplicate progress frames.
const DUPLICATE_WINDOW_MS: u64 = 50;

/// Fingerprint of a progress frame for duplicate detection.
#[derive(PartialEq, Eq)]
struct ProgressMark {
    at_ms: u64,
    progress: u8,
    message: String,
}

/// Broadcast emitter shared by every engine component.
pub struct EventEmitter<C: Clock> {
    tx: broadcast::Sender<Event>,
    clock: C,
    last_progress: Mutex<HashMap<JobId, ProgressMark>>,
}

impl<C: Clock> EventEmitter<C> {
    pub fn new(clock: C, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, clock, last_progress: Mutex::new(HashMap::new()) }
    }

    /// Subscribe to the full event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit an event, suppressing duplicate progress frames.
    ///
    /// Returns true when the event was actually published. Send failures
    /// (no subscribers) are not errors.
    pub fn emit(&self, event: Event) -> bool {
        if event.is_droppable_progress() {
            if let Event::JobProgress { job, .. } = &event {
                let now = self.clock.epoch_ms();
                let mark = ProgressMark {
                    at_ms: now,
                    progress: job.progress,
                    message: job.message.clone(),
                };
                let mut last = self.last_progress.lock();
                if let Some(prev) = last.get(&job.job_id) {
                    let duplicate = prev.progress == mark.progress
                        && prev.message == mark.message
                        && now.saturating_sub(prev.at_ms) < DUPLICATE_WINDOW_MS;
                    if duplicate {
                        return false;
                    }
                }
                last.insert(job.job_id.clone(), mark);
            }
        }
        tracing::debug!(event = %event.log_summary(), "emit");
        let _ = self.tx.send(event);
        true
    }

    /// Drop the progress fingerprint for a finished job.
    pub fn forget_job(&self, job_id: &JobId) {
        self.last_progress.lock().remove(job_id);
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

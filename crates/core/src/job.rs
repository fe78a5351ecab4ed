// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Job record and status machine.
//!
//! A job is the externally observable unit of work: callers learn about it
//! through polls or push events, never by reading internal workflow state.

use crate::error::{Error, ErrorContext, ErrorKind};
use crate::id::{JobId, SessionId};
use serde::{Deserialize, Serialize};

/// Delivery mode requested by the caller at job start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportHint {
    /// Request/response polling; the caller must come back for progress.
    Pull,
    /// Server-initiated event stream; poll interval is always zero.
    Push,
}

crate::simple_display! {
    TransportHint {
        Pull => "pull",
        Push => "push",
    }
}

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
}

/// One externally observable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub tool_name: String,
    pub session_id: SessionId,
    pub status: JobStatus,
    /// Percentage in `[0, 100]`, non-decreasing for the life of the job.
    pub progress: u8,
    pub message: String,
    pub created_at: u64,
    pub updated_at: u64,
    /// Present iff `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub transport: TransportHint,
}

/// Partial update applied to a job as work proceeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl JobRecord {
    pub fn new(
        job_id: JobId,
        session_id: SessionId,
        tool_name: impl Into<String>,
        transport: TransportHint,
        now_ms: u64,
    ) -> Self {
        Self {
            job_id,
            tool_name: tool_name.into(),
            session_id,
            status: JobStatus::Pending,
            progress: 0,
            message: String::new(),
            created_at: now_ms,
            updated_at: now_ms,
            result: None,
            transport,
        }
    }

    /// Apply a patch, enforcing the job invariants.
    ///
    /// Rejects progress decreases, terminal-to-anything transitions, progress
    /// out of `[0, 100]`, results on non-completed jobs, and completion
    /// without a result. `updated_at` advances to `now_ms` on success.
    pub fn apply(&mut self, patch: JobPatch, now_ms: u64) -> Result<(), Error> {
        if let Some(status) = patch.status {
            if self.status.is_terminal() && status != self.status {
                return Err(self.conflict(format!(
                    "job is {} and cannot transition to {}",
                    self.status, status
                )));
            }
        }
        if let Some(progress) = patch.progress {
            if progress > 100 {
                return Err(self.validation(format!("progress {progress} exceeds 100")));
            }
            if progress < self.progress {
                return Err(self.conflict(format!(
                    "progress cannot decrease ({} -> {})",
                    self.progress, progress
                )));
            }
        }
        // result appears iff the job is completed
        let completing = patch.status == Some(JobStatus::Completed);
        if patch.result.is_some() && !completing && self.status != JobStatus::Completed {
            return Err(self.validation("result is only valid on completion".to_string()));
        }
        if completing && patch.result.is_none() && self.result.is_none() {
            return Err(self.validation("completion requires a result".to_string()));
        }

        if let Some(status) = patch.status {
            self.status = status;
            if status == JobStatus::Completed {
                self.progress = 100;
            }
        }
        if let Some(progress) = patch.progress {
            if progress > self.progress {
                self.progress = progress;
            }
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(result) = patch.result {
            self.result = Some(result);
        }
        self.updated_at = self.updated_at.max(now_ms);
        Ok(())
    }

    fn conflict(&self, msg: String) -> Error {
        Error::new(ErrorKind::Conflict, msg).with_context(
            ErrorContext::new("job", "apply_patch").entity(self.job_id.as_str()),
        )
    }

    fn validation(&self, msg: String) -> Error {
        Error::new(ErrorKind::Validation, msg).with_context(
            ErrorContext::new("job", "apply_patch").entity(self.job_id.as_str()),
        )
    }
}

crate::record_builder! {
    /// Test builder for [`JobRecord`].
    pub struct JobRecordBuilder for JobRecord {
        text {
            job_id: JobId = "job-test",
            tool_name: String = "decompose",
            session_id: SessionId = "sess-test",
        }
        value {
            status: JobStatus = JobStatus::Pending,
            progress: u8 = 0,
            message: String = String::new(),
            created_at: u64 = 1_000_000,
            updated_at: u64 = 1_000_000,
            transport: TransportHint = TransportHint::Pull,
        }
        unset {
            result: serde_json::Value,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

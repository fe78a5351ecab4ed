// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Job record snapshots: `jobs/<jobId>.json`.
//!
//! Jobs are authoritative in memory; snapshots exist so a restarted daemon
//! can answer `get_job_result` for work finished before the crash.

use std::fs;
use std::path::PathBuf;

use maestro_core::{JobId, JobRecord};
use tracing::warn;

use crate::atomic::{load_json_or_quarantine, write_json_atomic};
use crate::StorageError;

pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn save(&self, job: &JobRecord) -> Result<(), StorageError> {
        write_json_atomic(&self.path_for(&job.job_id), job)
    }

    pub fn delete(&self, id: &JobId) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn scan(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_json_or_quarantine::<JobRecord>(&path)? {
                Some(job) => out.push(job),
                None => warn!(path = %path.display(), "skipped unreadable job snapshot"),
            }
        }
        out.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(out)
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Per-workflow document store: `workflows/<workflowId>.json`.

use std::fs;
use std::path::PathBuf;

use maestro_core::{Workflow, WorkflowId};
use tracing::{debug, warn};

use crate::atomic::{load_json_or_quarantine, write_json_atomic};
use crate::StorageError;

/// Store for workflow state documents.
pub struct WorkflowStore {
    dir: PathBuf,
}

impl WorkflowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &WorkflowId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist a workflow document atomically.
    pub fn save(&self, workflow: &Workflow) -> Result<(), StorageError> {
        write_json_atomic(&self.path_for(&workflow.workflow_id), workflow)
    }

    pub fn load(&self, id: &WorkflowId) -> Result<Option<Workflow>, StorageError> {
        load_json_or_quarantine(&self.path_for(id))
    }

    pub fn delete(&self, id: &WorkflowId) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan the workflow directory, skipping quarantined and foreign files.
    ///
    /// Used at startup to reconstruct in-memory state.
    pub fn scan(&self) -> Result<Vec<Workflow>, StorageError> {
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
            match load_json_or_quarantine::<Workflow>(&path)? {
                Some(workflow) => {
                    debug!(id = %workflow.workflow_id, "recovered workflow document");
                    out.push(workflow);
                }
                None => warn!(path = %path.display(), "skipped unreadable workflow document"),
            }
        }
        // deterministic recovery order
        out.sort_by(|a, b| a.workflow_id.cmp(&b.workflow_id));
        Ok(out)
    }
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Hierarchical ID counter store backed by `counters.json`.
//!
//! A process-wide mutex serializes every increment; the document is written
//! atomically after each allocation, so counters never run backwards across
//! restarts. Allocation probes an occupancy predicate and advances past
//! collisions up to the configured retry limit.

use std::collections::HashMap;
use std::path::PathBuf;

use maestro_core::id::{sanitize_name_segment, DependencyId, EpicId, ProjectId, TaskId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::atomic::{load_json, write_json_atomic};
use crate::StorageError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterDoc {
    #[serde(default)]
    projects: HashMap<String, u64>,
    #[serde(default)]
    epics: u64,
    #[serde(default)]
    tasks: u64,
    #[serde(default)]
    dependencies: HashMap<String, u64>,
}

/// Durable allocator for the hierarchical ID families.
pub struct CounterStore {
    path: PathBuf,
    retry_limit: u32,
    doc: Mutex<CounterDoc>,
}

impl CounterStore {
    /// Open (or create) the counter document at `path`.
    pub fn open(path: impl Into<PathBuf>, retry_limit: u32) -> Result<Self, StorageError> {
        let path = path.into();
        let doc = load_json(&path)?.unwrap_or_default();
        Ok(Self { path, retry_limit, doc: Mutex::new(doc) })
    }

    /// Allocate the next project ID for `name`.
    ///
    /// `name` must already have passed project-name validation; the segment
    /// is derived here so equal names share a counter.
    pub fn next_project_id(
        &self,
        name: &str,
        taken: impl Fn(&str) -> bool,
    ) -> Result<ProjectId, StorageError> {
        let segment = sanitize_name_segment(name);
        let mut doc = self.doc.lock();
        let counter = doc.projects.entry(segment.clone()).or_insert(0);
        for _ in 0..self.retry_limit {
            *counter += 1;
            let id = ProjectId::format(&segment, *counter);
            if !taken(id.as_str()) {
                write_json_atomic(&self.path, &*doc)?;
                return Ok(id);
            }
        }
        Err(StorageError::IdExhausted { family: "project", attempts: self.retry_limit })
    }

    pub fn next_epic_id(&self, taken: impl Fn(&str) -> bool) -> Result<EpicId, StorageError> {
        let mut doc = self.doc.lock();
        for _ in 0..self.retry_limit {
            doc.epics += 1;
            let id = EpicId::format(doc.epics);
            if !taken(id.as_str()) {
                write_json_atomic(&self.path, &*doc)?;
                return Ok(id);
            }
        }
        Err(StorageError::IdExhausted { family: "epic", attempts: self.retry_limit })
    }

    /// Allocate the next task ID, globally unique across projects.
    pub fn next_task_id(&self, taken: impl Fn(&str) -> bool) -> Result<TaskId, StorageError> {
        let mut doc = self.doc.lock();
        for _ in 0..self.retry_limit {
            doc.tasks += 1;
            let id = TaskId::format(doc.tasks);
            if !taken(id.as_str()) {
                write_json_atomic(&self.path, &*doc)?;
                return Ok(id);
            }
        }
        Err(StorageError::IdExhausted { family: "task", attempts: self.retry_limit })
    }

    pub fn next_dependency_id(
        &self,
        from: &TaskId,
        to: &TaskId,
        taken: impl Fn(&str) -> bool,
    ) -> Result<DependencyId, StorageError> {
        let key = format!("{from}-{to}");
        let mut doc = self.doc.lock();
        let counter = doc.dependencies.entry(key).or_insert(0);
        for _ in 0..self.retry_limit {
            *counter += 1;
            let id = DependencyId::format(from, to, *counter);
            if !taken(id.as_str()) {
                write_json_atomic(&self.path, &*doc)?;
                return Ok(id);
            }
        }
        Err(StorageError::IdExhausted { family: "dependency", attempts: self.retry_limit })
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;

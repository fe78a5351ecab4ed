// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Agent registry document: `agents.json`.

use std::collections::HashMap;
use std::path::PathBuf;

use maestro_core::{Agent, AgentId};

use crate::atomic::{load_json_or_quarantine, write_json_atomic};
use crate::StorageError;

pub struct AgentRegistryStore {
    path: PathBuf,
}

impl AgentRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist the whole registry. Small document, rewritten on every change.
    pub fn save(&self, agents: &HashMap<AgentId, Agent>) -> Result<(), StorageError> {
        let mut list: Vec<&Agent> = agents.values().collect();
        list.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        write_json_atomic(&self.path, &list)
    }

    pub fn load(&self) -> Result<HashMap<AgentId, Agent>, StorageError> {
        let list: Vec<Agent> = load_json_or_quarantine(&self.path)?.unwrap_or_default();
        Ok(list.into_iter().map(|a| (a.agent_id.clone(), a)).collect())
    }
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;

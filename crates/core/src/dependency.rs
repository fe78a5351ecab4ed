// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Dependency edges between tasks.

use crate::id::{DependencyId, TaskId};
use serde::{Deserialize, Serialize};

/// Strength of a dependency edge.
///
/// Only `requires` edges gate readiness and constitute cycle errors;
/// `suggests` edges inform diagnostics and are the first candidates for
/// removal when a cycle must be broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Requires,
    Suggests,
}

crate::simple_display! {
    DependencyType {
        Requires => "requires",
        Suggests => "suggests",
    }
}

/// Directed edge `from -> to` meaning *from blocks to*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<DependencyId>,
    pub from: TaskId,
    pub to: TaskId,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
}

impl Dependency {
    pub fn requires(from: impl Into<TaskId>, to: impl Into<TaskId>) -> Self {
        Self { dependency_id: None, from: from.into(), to: to.into(), dep_type: DependencyType::Requires }
    }

    pub fn suggests(from: impl Into<TaskId>, to: impl Into<TaskId>) -> Self {
        Self { dependency_id: None, from: from.into(), to: to.into(), dep_type: DependencyType::Suggests }
    }

    pub fn is_hard(&self) -> bool {
        self.dep_type == DependencyType::Requires
    }
}

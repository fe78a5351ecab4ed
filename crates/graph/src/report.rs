// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Structured validation report.

use maestro_core::TaskId;
use serde::{Deserialize, Serialize};

/// Severity of a detected cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSeverity {
    Medium,
    High,
    Critical,
}

maestro_core::simple_display! {
    CycleSeverity {
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// One detected cycle, closed (first ID repeats at the end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDependency {
    pub cycle: Vec<TaskId>,
    pub severity: CycleSeverity,
    /// Human-actionable ways to break the loop, most preferred first.
    pub resolution_options: Vec<String>,
}

/// Hard validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    SelfDependency { task_id: TaskId },
    MissingTask { task_id: TaskId, referenced_by: TaskId },
    InvalidDependencyType { from: TaskId, to: TaskId },
}

/// Suspicious but legal structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A lower-priority task blocks a higher-priority one.
    PriorityInversion { from: TaskId, to: TaskId },
    /// Dependency runs against the pipeline stage ordering.
    TypeOrderViolation { from: TaskId, to: TaskId },
    ChainTooDeep { depth: usize, max: usize, task_id: TaskId },
    ChainTooLong { length: usize, max: usize, task_id: TaskId },
    CrossEpicDependency { from: TaskId, to: TaskId },
}

/// Opportunities the caller may want to act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationSuggestion {
    /// A much larger task (>3x estimate) gates a small one.
    LargeTaskBlocksSmall { from: TaskId, to: TaskId },
    /// Unordered tasks touch the same files.
    SharedFilePaths { a: TaskId, b: TaskId, paths: Vec<String> },
    /// Adjacent tasks differ by more than one priority level.
    PriorityGap { from: TaskId, to: TaskId, gap: u8 },
}

/// Full validator output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub circular_dependencies: Vec<CircularDependency>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<ValidationSuggestion>,
    /// Present only when the graph is acyclic and structurally valid.
    pub execution_order: Vec<TaskId>,
}

impl ValidationReport {
    /// No cycles and no hard errors.
    pub fn is_valid(&self) -> bool {
        self.circular_dependencies.is_empty() && self.errors.is_empty()
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Identifier types and validation.
//!
//! Two ID families live here:
//!
//! - **Opaque IDs** (`JobId`, `WorkflowId`, `SessionId`, `AgentId`) — random
//!   or caller-supplied strings with no internal structure.
//! - **Hierarchical IDs** (`ProjectId`, `EpicId`, `TaskId`, `DependencyId`) —
//!   counter-backed, shape-validated strings allocated through the storage
//!   counter store. Core owns the formats; storage owns the counters.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

crate::string_id! {
    /// Unique identifier for an externally observable job.
    pub struct JobId;
}

crate::string_id! {
    /// Unique identifier for a workflow (one per user request).
    pub struct WorkflowId;
}

crate::string_id! {
    /// Caller session identifier, supplied by the transport layer.
    pub struct SessionId;
}

crate::string_id! {
    /// Worker agent identifier, supplied at registration.
    pub struct AgentId;
}

impl JobId {
    /// Generate a new random job ID.
    pub fn generate() -> Self {
        Self(format!("job-{}", nanoid::nanoid!(19)))
    }
}

impl WorkflowId {
    /// Generate a new random workflow ID.
    pub fn generate() -> Self {
        Self(format!("wf-{}", nanoid::nanoid!(19)))
    }
}

crate::string_id! {
    /// Project identifier: `PID-<UPPER_NAME>-<NNN>`.
    pub struct ProjectId;
}

crate::string_id! {
    /// Epic identifier: `E<NNN>`.
    pub struct EpicId;
}

crate::string_id! {
    /// Task identifier: `T<NNNN>`, globally unique across projects.
    pub struct TaskId;
}

crate::string_id! {
    /// Dependency identifier: `DEP-<fromTaskId>-<toTaskId>-<NNN>`.
    pub struct DependencyId;
}

// Patterns are compile-time constants; a parse failure is unreachable.
fn compiled(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(_) => unreachable!("invalid ID pattern"),
    }
}

fn project_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^PID-[A-Z0-9-]{1,20}-\d{3,}$"))
}

fn epic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^E\d{3,}$"))
}

fn task_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^T\d{4,}$"))
}

fn dependency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^DEP-T\d{4,}-T\d{4,}-\d{3,}$"))
}

impl ProjectId {
    /// Format a project ID from a sanitized name segment and counter value.
    pub fn format(name_segment: &str, counter: u64) -> Self {
        Self(format!("PID-{}-{:03}", name_segment, counter))
    }

    /// Check that a string has the `PID-<UPPER_NAME>-<NNN>` shape.
    pub fn is_valid(s: &str) -> bool {
        project_re().is_match(s)
    }
}

impl EpicId {
    pub fn format(counter: u64) -> Self {
        Self(format!("E{:03}", counter))
    }

    pub fn is_valid(s: &str) -> bool {
        epic_re().is_match(s)
    }
}

impl TaskId {
    pub fn format(counter: u64) -> Self {
        Self(format!("T{:04}", counter))
    }

    pub fn is_valid(s: &str) -> bool {
        task_re().is_match(s)
    }
}

impl DependencyId {
    pub fn format(from: &TaskId, to: &TaskId, counter: u64) -> Self {
        Self(format!("DEP-{}-{}-{:03}", from, to, counter))
    }

    pub fn is_valid(s: &str) -> bool {
        dependency_re().is_match(s)
    }
}

/// Maximum length of the name segment inside a project ID.
pub const PROJECT_NAME_SEGMENT_MAX: usize = 20;

/// Bounds on raw project names accepted by [`validate_project_name`].
pub const PROJECT_NAME_MIN: usize = 2;
pub const PROJECT_NAME_MAX: usize = 50;

/// Words dropped when deriving a shorter suggested name.
const STOP_WORDS: &[&str] = &["the", "a", "an", "and", "of", "for", "to", "in", "on", "with"];

/// Outcome of project-name validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameValidation {
    /// Name is acceptable; carries the derived ID name segment.
    Valid { segment: String },
    /// Name was rejected; carries the reason and a usable suggestion.
    Invalid { reason: String, suggestion: String },
}

impl NameValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, NameValidation::Valid { .. })
    }
}

/// Validate a raw project name per the ID rules.
///
/// Rejects names shorter than [`PROJECT_NAME_MIN`], longer than
/// [`PROJECT_NAME_MAX`], or containing characters outside `[A-Za-z0-9 _-]`.
/// Rejections carry a suggested shorter name derived by dropping stop-words
/// and truncating.
pub fn validate_project_name(name: &str) -> NameValidation {
    let trimmed = name.trim();
    if trimmed.len() < PROJECT_NAME_MIN {
        return NameValidation::Invalid {
            reason: format!("project name must be at least {PROJECT_NAME_MIN} characters"),
            suggestion: suggest_name(trimmed),
        };
    }
    if trimmed.len() > PROJECT_NAME_MAX {
        return NameValidation::Invalid {
            reason: format!("project name must be at most {PROJECT_NAME_MAX} characters"),
            suggestion: suggest_name(trimmed),
        };
    }
    if let Some(bad) = trimmed.chars().find(|c| !is_name_char(*c)) {
        return NameValidation::Invalid {
            reason: format!("project name contains invalid character {bad:?}"),
            suggestion: suggest_name(trimmed),
        };
    }
    NameValidation::Valid { segment: sanitize_name_segment(trimmed) }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '_' || c == '-'
}

/// Uppercase, collapse runs of non-alphanumerics to `-`, trim `-`, and
/// truncate to [`PROJECT_NAME_SEGMENT_MAX`] characters.
pub fn sanitize_name_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_uppercase());
        } else {
            pending_dash = true;
        }
    }
    out.truncate(PROJECT_NAME_SEGMENT_MAX);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Derive a shorter, valid name by dropping stop-words and truncating.
fn suggest_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| is_name_char(*c)).collect();
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_ascii_lowercase().as_str()))
        .collect();
    let mut joined = if words.is_empty() { cleaned.trim().to_string() } else { words.join(" ") };
    joined.truncate(PROJECT_NAME_MAX);
    let trimmed = joined.trim().to_string();
    if trimmed.len() < PROJECT_NAME_MIN {
        "project".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

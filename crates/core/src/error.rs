// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Kind-tagged error type shared across the daemon.
//!
//! Crate-local failures (storage, protocol, runtime) convert into this type
//! at component boundaries so callers can route on [`ErrorKind`] alone.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Classification tag determining propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    Conflict,
    Timeout,
    RateLimited,
    DependencyCycle,
    ResourceExhausted,
    Internal,
}

impl ErrorKind {
    /// Errors returned to the caller as-is, with no retry.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::NotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::Conflict
                | ErrorKind::RateLimited
                | ErrorKind::DependencyCycle
        )
    }
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        NotFound => "not_found",
        PermissionDenied => "permission_denied",
        Conflict => "conflict",
        Timeout => "timeout",
        RateLimited => "rate_limited",
        DependencyCycle => "dependency_cycle",
        ResourceExhausted => "resource_exhausted",
        Internal => "internal",
    }
}

/// Where an error happened and what it touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            entity_ids: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.entity_ids.push(id.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A kind-tagged error with structured context.
#[derive(Debug, Clone, PartialEq, ThisError, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<ErrorContext>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), context: None }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{entity} {id} not found"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

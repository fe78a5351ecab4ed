// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Storage error type.

use maestro_core::{Error, ErrorContext, ErrorKind};
use thiserror::Error as ThisError;

/// Errors from the durable state layer.
#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Counter advanced past the retry limit without finding a free ID.
    #[error("exhausted {family} IDs after {attempts} attempts")]
    IdExhausted { family: &'static str, attempts: u32 },

    #[error("document not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            StorageError::IdExhausted { .. } => ErrorKind::ResourceExhausted,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Io(_) | StorageError::Json(_) => ErrorKind::Internal,
        };
        Error::new(kind, err.to_string())
            .with_context(ErrorContext::new("storage", "persist"))
    }
}

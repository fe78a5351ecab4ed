// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Atomic document writes.
//!
//! Serialize → write `<file>.tmp` → fsync → rename over `<file>`. Readers
//! either see the old document or the new one, never a torn write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::StorageError;

/// Write `value` as pretty JSON to `path` atomically.
///
/// The parent directory is created if missing. The temp file lives next to
/// the target so the rename stays on one filesystem.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a JSON document, or `None` if the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Load a JSON document, setting aside unreadable files as `<file>.corrupt`.
///
/// Used by startup scans: a corrupt document is renamed and skipped with a
/// warning, never deleted.
pub fn load_json_or_quarantine<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StorageError> {
    match load_json(path) {
        Ok(value) => Ok(value),
        Err(StorageError::Json(e)) => {
            let quarantined = path.with_extension("json.corrupt");
            warn!(path = %path.display(), error = %e, "quarantining corrupt document");
            if let Err(rename_err) = fs::rename(path, &quarantined) {
                warn!(path = %path.display(), error = %rename_err, "quarantine rename failed");
            }
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;

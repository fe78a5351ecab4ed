// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Doc {
    name: String,
    counters: HashMap<String, u64>,
}

fn doc() -> Doc {
    let mut counters = HashMap::new();
    counters.insert("task".to_string(), 42);
    Doc { name: "test".to_string(), counters }
}

#[test]
fn write_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    write_json_atomic(&path, &doc()).unwrap();
    let loaded: Doc = load_json(&path).unwrap().unwrap();
    assert_eq!(loaded, doc());
}

#[test]
fn write_creates_missing_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/doc.json");
    write_json_atomic(&path, &doc()).unwrap();
    assert!(path.exists());
}

#[test]
fn overwrite_leaves_no_tmp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    write_json_atomic(&path, &doc()).unwrap();
    write_json_atomic(&path, &doc()).unwrap();
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["doc.json".to_string()]);
}

#[test]
fn load_missing_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let loaded: Option<Doc> = load_json(&dir.path().join("absent.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_document_is_quarantined_not_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    std::fs::write(&path, b"{not json").unwrap();

    let loaded: Option<Doc> = load_json_or_quarantine(&path).unwrap();
    assert!(loaded.is_none());
    assert!(!path.exists());
    assert!(dir.path().join("doc.json.corrupt").exists());
}

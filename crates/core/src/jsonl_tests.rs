// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestRecord {
    id: u32,
    name: String,
}

fn rec(id: u32, name: &str) -> TestRecord {
    TestRecord {
        id,
        name: name.into(),
    }
}

#[test]
fn append_creates_file_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &rec(1, "first")).unwrap();

    assert!(path.exists());
}

#[test]
fn append_and_read_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &rec(1, "first")).unwrap();
    append(&path, &rec(2, "second")).unwrap();

    let records = read_journal::<TestRecord>(&path).unwrap().records;
    assert_eq!(records, vec![rec(1, "first"), rec(2, "second")]);
}

#[test]
fn write_all_replaces_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &rec(1, "first")).unwrap();
    write_all(&path, &[rec(2, "replaced")]).unwrap();

    let records = read_journal::<TestRecord>(&path).unwrap().records;
    assert_eq!(records, vec![rec(2, "replaced")]);
    assert!(!dir.path().join("test.jsonl.tmp").exists());
}

#[test]
fn read_journal_drops_torn_tail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.jsonl");

    append(&path, &rec(1, "first")).unwrap();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    write!(file, "{{\"id\":2,\"na").unwrap();

    let journal: Journal<TestRecord> = read_journal(&path).unwrap();
    assert_eq!(journal.records, vec![rec(1, "first")]);
    assert!(journal.torn_tail);
}

#[test]
fn read_journal_rejects_corruption_in_the_middle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.jsonl");

    std::fs::write(
        &path,
        "{\"id\":1,\"name\":\"a\"}\nnot json\n{\"id\":3,\"name\":\"c\"}\n",
    )
    .unwrap();

    let err = read_journal::<TestRecord>(&path).unwrap_err();
    assert!(matches!(err, Error::CorruptedData(ref m) if m.contains("line 2")));
}

#[test]
fn read_journal_skips_blank_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.jsonl");

    std::fs::write(&path, "\n{\"id\":1,\"name\":\"a\"}\n   \n").unwrap();

    let journal: Journal<TestRecord> = read_journal(&path).unwrap();
    assert_eq!(journal.records.len(), 1);
    assert!(!journal.torn_tail);
}

#[test]
fn read_journal_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let journal: Journal<TestRecord> = read_journal(&dir.path().join("none.jsonl")).unwrap();
    assert!(journal.records.is_empty());
    assert!(!journal.torn_tail);
}

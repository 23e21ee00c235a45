// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Provides durable append-only storage for JSON-serializable records.
//! Each record is stored as a single JSON line with fsync for durability.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Records read from a journal, plus whether a torn final line was dropped.
#[derive(Debug)]
pub struct Journal<T> {
    pub records: Vec<T>,
    /// True if the last line failed to parse and was skipped.
    ///
    /// A crash in the middle of an append leaves at most one partial line,
    /// always at the end of the file.
    pub torn_tail: bool,
}

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let json = serde_json::to_string(record)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads a journal, tolerating a torn final line.
///
/// A malformed line anywhere but the end is corruption and is reported as
/// [`Error::CorruptedData`].
pub fn read_journal<T: DeserializeOwned>(path: &Path) -> Result<Journal<T>> {
    let content = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Journal {
                records: Vec::new(),
                torn_tail: false,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<(usize, &[u8])> = content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .collect();

    let mut records = Vec::with_capacity(lines.len());
    let mut torn_tail = false;
    let last = lines.len().saturating_sub(1);

    for (pos, (line_no, line)) in lines.iter().enumerate() {
        match serde_json::from_slice::<T>(line) {
            Ok(record) => records.push(record),
            Err(_) if pos == last => torn_tail = true,
            Err(e) => {
                return Err(Error::CorruptedData(format!(
                    "{}: line {}: {}",
                    path.display(),
                    line_no + 1,
                    e
                )));
            }
        }
    }

    Ok(Journal { records, torn_tail })
}

/// Writes all records to a JSONL file, replacing existing content.
///
/// The new content is written to a sibling temp file, fsynced, then renamed
/// over the original, so readers see either the old or the new file.
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = temp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;

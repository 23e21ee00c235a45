// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL journal-backed queue store.
//!
//! Every change is appended to the journal as a single line and fsynced
//! before it becomes visible, so anything acknowledged by [`QueueStore::put`]
//! survives a crash. On open the journal is replayed into memory and then
//! compacted. A crash mid-append leaves at most one torn line at the end of
//! the file; it is dropped on replay.
//!
//! A store holds an exclusive lock on a sidecar `.lock` file for as long
//! as it is open. Each store replays and compacts from its own view of the
//! journal, so a second writer would lose records; it fails to open
//! instead.
//!
//! Format: one entry per line, either `{"op":"put","record":{...}}` or
//! `{"op":"delete","id":"..."}`. Later entries supersede earlier ones.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use till_core::{jsonl, Bookkeeping, QueuedMutation};

use super::{QueueStore, StoreError, StoreResult};

/// Superseded entries tolerated before the journal is rewritten.
const COMPACT_MIN_DEAD: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Entry {
    Put { record: QueuedMutation },
    Delete { id: String },
}

struct JournalState {
    records: BTreeMap<String, QueuedMutation>,
    /// Journal lines that no longer describe a live record.
    dead: usize,
}

/// Durable queue store persisted as a JSONL journal.
pub struct JournalStore {
    path: PathBuf,
    state: Mutex<JournalState>,
    /// Held for the store's lifetime; released on drop.
    _lock: File,
}

fn acquire_lock(lock_path: &Path) -> StoreResult<File> {
    use fs2::FileExt;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;
    if let Err(e) = file.try_lock_exclusive() {
        tracing::debug!(path = %lock_path.display(), error = %e, "queue journal lock held");
        return Err(StoreError::Locked(lock_path.display().to_string()));
    }
    Ok(file)
}

impl JournalStore {
    /// Opens or creates a journal at the given path and replays it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock = acquire_lock(&path.with_extension("lock"))?;
        let journal = jsonl::read_journal::<Entry>(&path)?;
        if journal.torn_tail {
            tracing::warn!(
                path = %path.display(),
                "dropped torn final entry from queue journal"
            );
        }

        let mut records = BTreeMap::new();
        for entry in journal.records {
            match entry {
                Entry::Put { record } => {
                    records.insert(record.id().to_string(), record);
                }
                Entry::Delete { id } => {
                    records.remove(&id);
                }
            }
        }

        let store = JournalStore {
            path,
            state: Mutex::new(JournalState { records, dead: 0 }),
            _lock: lock,
        };
        {
            let mut state = store.lock();
            store.compact(&mut state)?;
        }
        tracing::debug!(
            path = %store.path.display(),
            pending = store.lock().records.len(),
            "opened queue journal"
        );
        Ok(store)
    }

    /// Returns the path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Compacts once superseded lines outnumber live records.
    fn maybe_compact(&self, state: &mut JournalState) {
        if state.dead < COMPACT_MIN_DEAD || state.dead <= state.records.len() {
            return;
        }
        // The journal is already durable; a failed rewrite only costs space.
        if let Err(e) = self.compact(state) {
            tracing::warn!(path = %self.path.display(), error = %e, "queue journal compaction failed");
        }
    }

    /// Rewrites the journal so it holds exactly one entry per live record.
    fn compact(&self, state: &mut JournalState) -> StoreResult<()> {
        let entries: Vec<Entry> = state
            .records
            .values()
            .cloned()
            .map(|record| Entry::Put { record })
            .collect();
        jsonl::write_all(&self.path, &entries)?;
        state.dead = 0;
        Ok(())
    }
}

impl QueueStore for JournalStore {
    fn put(&self, record: QueuedMutation) -> StoreResult<()> {
        let mut state = self.lock();
        if state.records.contains_key(record.id()) {
            return Err(StoreError::Duplicate(record.id().to_string()));
        }

        let entry = Entry::Put { record };
        jsonl::append(&self.path, &entry)?;
        if let Entry::Put { record } = entry {
            state.records.insert(record.id().to_string(), record);
        }
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<QueuedMutation>> {
        Ok(self.lock().records.get(id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.lock();
        if !state.records.contains_key(id) {
            return Ok(false);
        }

        jsonl::append(&self.path, &Entry::Delete { id: id.to_string() })?;
        state.records.remove(id);
        // The delete line itself and the put it cancels are both dead.
        state.dead += 2;
        self.maybe_compact(&mut state);
        Ok(true)
    }

    fn list_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock().records.keys().cloned().collect())
    }

    fn update(
        &self,
        id: &str,
        mutate: &mut dyn FnMut(&mut Bookkeeping),
    ) -> StoreResult<Option<QueuedMutation>> {
        let mut state = self.lock();
        let Some(mut record) = state.records.get(id).cloned() else {
            return Ok(None);
        };

        mutate(record.bookkeeping_mut());

        let entry = Entry::Put { record };
        jsonl::append(&self.path, &entry)?;
        let Entry::Put { record } = entry else {
            return Ok(None);
        };
        state.records.insert(id.to_string(), record.clone());
        state.dead += 1;
        self.maybe_compact(&mut state);
        Ok(Some(record))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.lock().records.len())
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;

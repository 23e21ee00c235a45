// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue store.
//!
//! A dumb, durable dictionary from mutation id to [`QueuedMutation`]. The
//! store carries no retry or network policy; the queue manager owns that.
//! Every operation is atomic per key, which is all the queue manager needs
//! since it is the single owner of processing.
//!
//! # Implementations
//!
//! - [`JournalStore`] - JSONL journal on disk, survives restarts
//! - [`MemoryStore`] - in-process map for tests and ephemeral sessions

mod journal;
mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

use till_core::{Bookkeeping, QueuedMutation};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The journal could not be replayed.
    #[error("corrupted queue journal: {0}")]
    Corrupted(String),

    /// A record with this id already exists.
    #[error("duplicate mutation id: {0}")]
    Duplicate(String),

    /// Another process has the journal open.
    #[error("queue journal {0} is in use by another process")]
    Locked(String),
}

impl From<till_core::Error> for StoreError {
    fn from(e: till_core::Error) -> Self {
        match e {
            till_core::Error::Io(e) => StoreError::Io(e),
            till_core::Error::Json(e) => StoreError::Serialization(e),
            other => StoreError::Corrupted(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent keyed collection of pending mutations.
pub trait QueueStore: Send + Sync {
    /// Inserts a new record. Fails with [`StoreError::Duplicate`] if the id
    /// is already present, since ids are unique for the store's lifetime.
    fn put(&self, record: QueuedMutation) -> StoreResult<()>;

    /// Reads a record by id.
    fn get(&self, id: &str) -> StoreResult<Option<QueuedMutation>>;

    /// Removes a record. Returns false if it was not present.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Lists the ids of all records, in no particular order.
    fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// Read-modify-write of a record's bookkeeping.
    ///
    /// Returns the updated record, or `None` if the id is not present.
    fn update(
        &self,
        id: &str,
        mutate: &mut dyn FnMut(&mut Bookkeeping),
    ) -> StoreResult<Option<QueuedMutation>>;

    /// Number of records currently stored.
    fn len(&self) -> StoreResult<usize> {
        Ok(self.list_keys()?.len())
    }

    /// Returns true if nothing is queued.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads every record, sorted by enqueue time.
    fn load_all(&self) -> StoreResult<Vec<QueuedMutation>> {
        let mut records = Vec::new();
        for id in self.list_keys()? {
            if let Some(record) = self.get(&id)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            a.enqueued_at()
                .cmp(&b.enqueued_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(records)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

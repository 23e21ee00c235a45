// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process queue store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use till_core::{Bookkeeping, QueuedMutation};

use super::{QueueStore, StoreError, StoreResult};

/// Non-durable store backed by a map. Records are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, QueuedMutation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, QueuedMutation>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl QueueStore for MemoryStore {
    fn put(&self, record: QueuedMutation) -> StoreResult<()> {
        let mut records = self.lock();
        if records.contains_key(record.id()) {
            return Err(StoreError::Duplicate(record.id().to_string()));
        }
        records.insert(record.id().to_string(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<QueuedMutation>> {
        Ok(self.lock().get(id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.lock().remove(id).is_some())
    }

    fn list_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn update(
        &self,
        id: &str,
        mutate: &mut dyn FnMut(&mut Bookkeeping),
    ) -> StoreResult<Option<QueuedMutation>> {
        let mut records = self.lock();
        Ok(records.get_mut(id).map(|record| {
            mutate(record.bookkeeping_mut());
            record.clone()
        }))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.lock().len())
    }
}

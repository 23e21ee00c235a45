// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic state for values touched by in-flight mutations.
//!
//! Each key maps to one entry holding the value the UI should show. A
//! mutation replaces the value wholesale with a provisional one and keeps
//! the previous value so a failure can restore it. Entries are never
//! patched in place.
//!
//! The latest mutation of a key owns the visible value. Earlier mutations
//! that are still unresolved stay chained behind it: when one succeeds its
//! value becomes the restore point, and when one fails it leaves the chain
//! without touching the visible value.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::events::{QueueEvent, Subscription};
use super::gateway::Dispatched;
use super::queue::QueueManager;
use super::transport::Response;
use crate::error::Result;

/// Confirmation state of a visible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Applied locally, request still in flight.
    Provisional,
    /// Accepted into the queue, awaiting delivery.
    PendingConfirmation,
    /// Matches what the server confirmed.
    Confirmed,
}

/// What a reader sees for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View<V> {
    pub value: V,
    pub status: ViewStatus,
}

/// Ties an outcome back to the mutation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    key: String,
    version: u64,
}

impl Handle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

struct Entry<V> {
    value: V,
    status: ViewStatus,
    /// Value to restore on failure; `None` removes the entry.
    previous: Option<V>,
    version: u64,
    queue_id: Option<String>,
    /// Superseded mutations still awaiting an outcome, oldest first.
    chain: Vec<Link<V>>,
}

/// An earlier mutation of the same key.
struct Link<V> {
    version: u64,
    value: V,
    queue_id: Option<String>,
}

struct Arena<V> {
    entries: HashMap<String, Entry<V>>,
    by_queue_id: HashMap<String, String>,
    next_version: u64,
}

impl<V: Clone> Arena<V> {
    fn current(&self, handle: &Handle) -> Option<&Entry<V>> {
        self.entries
            .get(&handle.key)
            .filter(|e| e.version == handle.version)
    }

    fn confirm(&mut self, key: &str, value: Option<V>) {
        if let Some(entry) = self.entries.get_mut(key) {
            if let Some(value) = value {
                entry.value = value;
            }
            entry.status = ViewStatus::Confirmed;
            entry.previous = None;
            if let Some(id) = entry.queue_id.take() {
                self.by_queue_id.remove(&id);
            }
            for link in entry.chain.drain(..) {
                if let Some(id) = link.queue_id {
                    self.by_queue_id.remove(&id);
                }
            }
        }
    }

    fn revert(&mut self, key: &str) {
        let Some(entry) = self.entries.remove(key) else {
            return;
        };
        let ids = entry
            .chain
            .iter()
            .filter_map(|l| l.queue_id.as_ref())
            .chain(entry.queue_id.as_ref());
        for id in ids {
            self.by_queue_id.remove(id);
        }
        if let Some(previous) = entry.previous {
            let version = self.bump();
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: previous,
                    status: ViewStatus::Confirmed,
                    previous: None,
                    version,
                    queue_id: None,
                    chain: Vec::new(),
                },
            );
        }
    }

    /// An earlier mutation went through: its value is now the restore
    /// point, and anything older in the chain is moot.
    fn advance(&mut self, key: &str, pos: usize, value: V) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.previous = Some(value);
        for link in entry.chain.drain(..=pos) {
            if let Some(id) = link.queue_id {
                self.by_queue_id.remove(&id);
            }
        }
    }

    fn unlink(&mut self, key: &str, pos: usize) {
        if let Some(entry) = self.entries.get_mut(key) {
            let link = entry.chain.remove(pos);
            if let Some(id) = link.queue_id {
                self.by_queue_id.remove(&id);
            }
        }
    }

    fn link_of(&self, handle: &Handle) -> Option<usize> {
        self.entries
            .get(&handle.key)?
            .chain
            .iter()
            .position(|l| l.version == handle.version)
    }

    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

/// Reconciles optimistic values with gateway and queue outcomes.
///
/// Cheap to clone; clones share state.
pub struct OptimisticCoordinator<V> {
    arena: Arc<Mutex<Arena<V>>>,
}

impl<V> Clone for OptimisticCoordinator<V> {
    fn clone(&self) -> Self {
        OptimisticCoordinator {
            arena: Arc::clone(&self.arena),
        }
    }
}

impl<V: Clone> Default for OptimisticCoordinator<V> {
    fn default() -> Self {
        OptimisticCoordinator {
            arena: Arc::new(Mutex::new(Arena {
                entries: HashMap::new(),
                by_queue_id: HashMap::new(),
                next_version: 0,
            })),
        }
    }
}

impl<V: Clone + Send + 'static> OptimisticCoordinator<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Arena<V>> {
        self.arena.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current value and status for a key.
    pub fn get(&self, key: &str) -> Option<View<V>> {
        self.lock().entries.get(key).map(|e| View {
            value: e.value.clone(),
            status: e.status,
        })
    }

    /// Records a server-confirmed value, e.g. from a refetch.
    ///
    /// A key with a mutation in flight keeps its provisional value; the
    /// fetched value becomes what a failure restores.
    pub fn reconcile(&self, key: &str, value: V) {
        let mut guard = self.lock();
        let arena = &mut *guard;
        match arena.entries.get_mut(key) {
            Some(entry) if entry.status != ViewStatus::Confirmed => {
                entry.previous = Some(value);
            }
            Some(entry) => entry.value = value,
            None => {
                let version = arena.bump();
                arena.entries.insert(
                    key.to_string(),
                    Entry {
                        value,
                        status: ViewStatus::Confirmed,
                        previous: None,
                        version,
                        queue_id: None,
                        chain: Vec::new(),
                    },
                );
            }
        }
    }

    /// Applies a provisional value before the request goes out.
    pub fn on_mutate(&self, key: &str, provisional: V) -> Handle {
        let mut guard = self.lock();
        let arena = &mut *guard;
        let version = arena.bump();
        let (previous, chain) = match arena.entries.remove(key) {
            Some(old) if old.status == ViewStatus::Confirmed => (Some(old.value), Vec::new()),
            Some(old) => {
                let mut chain = old.chain;
                chain.push(Link {
                    version: old.version,
                    value: old.value,
                    queue_id: old.queue_id,
                });
                (old.previous, chain)
            }
            None => (None, Vec::new()),
        };
        arena.entries.insert(
            key.to_string(),
            Entry {
                value: provisional,
                status: ViewStatus::Provisional,
                previous,
                version,
                queue_id: None,
                chain,
            },
        );
        Handle {
            key: key.to_string(),
            version,
        }
    }

    /// Applies the gateway's answer and hands it back to the caller.
    ///
    /// `confirmed` extracts the server's version of the value from a
    /// delivered response; returning `None` keeps the provisional value.
    pub fn on_outcome<F>(
        &self,
        handle: &Handle,
        outcome: Result<Dispatched>,
        confirmed: F,
    ) -> Result<Dispatched>
    where
        F: FnOnce(&Response) -> Option<V>,
    {
        let mut guard = self.lock();
        let arena = &mut *guard;
        if arena.current(handle).is_none() {
            let Some(pos) = arena.link_of(handle) else {
                tracing::debug!(key = %handle.key, "outcome for settled mutation ignored");
                return outcome;
            };
            match &outcome {
                Ok(Dispatched::Sent(response)) => {
                    let value = confirmed(response).or_else(|| {
                        arena
                            .entries
                            .get(&handle.key)
                            .map(|e| e.chain[pos].value.clone())
                    });
                    if let Some(value) = value {
                        arena.advance(&handle.key, pos, value);
                    }
                }
                Ok(Dispatched::Queued { id }) => {
                    if let Some(entry) = arena.entries.get_mut(&handle.key) {
                        entry.chain[pos].queue_id = Some(id.clone());
                    }
                    arena.by_queue_id.insert(id.clone(), handle.key.clone());
                }
                Err(_) => arena.unlink(&handle.key, pos),
            }
            return outcome;
        }

        match &outcome {
            Ok(Dispatched::Sent(response)) => {
                arena.confirm(&handle.key, confirmed(response));
            }
            Ok(Dispatched::Queued { id }) => {
                if let Some(entry) = arena.entries.get_mut(&handle.key) {
                    entry.status = ViewStatus::PendingConfirmation;
                    entry.queue_id = Some(id.clone());
                }
                arena.by_queue_id.insert(id.clone(), handle.key.clone());
            }
            Err(_) => arena.revert(&handle.key),
        }
        outcome
    }

    /// Settles an entry waiting on the queue.
    pub fn on_queue_event(&self, event: &QueueEvent) {
        let mut guard = self.lock();
        let arena = &mut *guard;
        let Some(key) = arena.by_queue_id.remove(event.id()) else {
            return;
        };
        let Some(entry) = arena.entries.get(&key) else {
            return;
        };
        if entry.queue_id.as_deref() == Some(event.id()) {
            match event {
                QueueEvent::Succeeded { .. } => arena.confirm(&key, None),
                QueueEvent::Failed { reason, .. } => {
                    tracing::warn!(key = %key, %reason, "queued mutation failed; reverting");
                    arena.revert(&key);
                }
            }
            return;
        }
        let Some(pos) = entry
            .chain
            .iter()
            .position(|l| l.queue_id.as_deref() == Some(event.id()))
        else {
            return;
        };
        match event {
            QueueEvent::Succeeded { .. } => {
                let value = entry.chain[pos].value.clone();
                arena.advance(&key, pos, value);
            }
            QueueEvent::Failed { reason, .. } => {
                tracing::warn!(key = %key, %reason, "earlier queued mutation failed; later value stands");
                arena.unlink(&key, pos);
            }
        }
    }

    /// Subscribes to the queue's outcomes.
    #[must_use = "dropping the subscription detaches the coordinator"]
    pub fn attach(&self, queue: &QueueManager) -> Subscription {
        let coordinator = self.clone();
        queue.subscribe(move |event| coordinator.on_queue_event(event))
    }
}

#[cfg(test)]
#[path = "optimistic_tests.rs"]
mod tests;

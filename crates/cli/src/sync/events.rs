// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed event bus with unsubscribe handles.
//!
//! Listeners are plain callbacks invoked synchronously on the emitting task.
//! The listener list is copied before dispatch, so a listener may subscribe
//! or unsubscribe (itself included) while being called.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Broadcasts events of type `E` to any number of listeners.
///
/// Clones share the same listener list.
pub struct EventBus<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        EventBus {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        EventBus {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = lock(&self.inner);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Delivers an event to every current listener.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

fn lock<E>(inner: &Mutex<Listeners<E>>) -> MutexGuard<'_, Listeners<E>> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle that keeps a listener registered.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keeps the listener registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Terminal outcome of a queued mutation.
///
/// Broadcast exactly once per record, when it leaves the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Succeeded {
        id: String,
        url: String,
    },
    Failed {
        id: String,
        url: String,
        reason: String,
    },
}

impl QueueEvent {
    pub fn id(&self) -> &str {
        match self {
            QueueEvent::Succeeded { id, .. } | QueueEvent::Failed { id, .. } => id,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            QueueEvent::Succeeded { url, .. } | QueueEvent::Failed { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueueEvent::Succeeded { .. })
    }
}

/// Cached reads of this URL are stale after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub url: String,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

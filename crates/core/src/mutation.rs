// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutation records.
//!
//! A [`QueuedMutation`] is the unit of durability: it is born at enqueue,
//! only its [`Bookkeeping`] changes while it waits, and it is removed from
//! the store on its terminal outcome. The request snapshot has no mutable
//! accessor, so a record's intent cannot change after it is created.

use serde::{Deserialize, Serialize};

use crate::snapshot::RequestSnapshot;

/// Default number of attempts a record gets before it fails permanently.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Mutable attempt bookkeeping for a queued record.
///
/// Exposes only monotonic operations: the retry count can only grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookkeeping {
    retry_count: u32,
    last_attempt_at: u64,
}

impl Bookkeeping {
    /// Number of retriable failures recorded so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Timestamp (ms) of the most recent send attempt, 0 if never attempted.
    pub fn last_attempt_at(&self) -> u64 {
        self.last_attempt_at
    }

    /// Records that a send attempt is starting at `now_ms`.
    pub fn mark_attempt(&mut self, now_ms: u64) {
        self.last_attempt_at = now_ms;
    }

    /// Records a retriable failure and returns the new retry count.
    pub fn record_failure(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }
}

/// A pending mutation awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMutation {
    id: String,
    request_snapshot: RequestSnapshot,
    enqueued_at: u64,
    max_retries: u32,
    #[serde(flatten)]
    bookkeeping: Bookkeeping,
}

impl QueuedMutation {
    /// Creates a fresh record with no attempts.
    pub fn new(
        id: impl Into<String>,
        request_snapshot: RequestSnapshot,
        enqueued_at: u64,
        max_retries: u32,
    ) -> Self {
        QueuedMutation {
            id: id.into(),
            request_snapshot,
            enqueued_at,
            max_retries,
            bookkeeping: Bookkeeping::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request_snapshot(&self) -> &RequestSnapshot {
        &self.request_snapshot
    }

    /// URL the mutation targets.
    pub fn url(&self) -> &str {
        &self.request_snapshot.url
    }

    pub fn enqueued_at(&self) -> u64 {
        self.enqueued_at
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.bookkeeping.retry_count
    }

    pub fn last_attempt_at(&self) -> u64 {
        self.bookkeeping.last_attempt_at
    }

    pub fn bookkeeping(&self) -> &Bookkeeping {
        &self.bookkeeping
    }

    /// Mutable access to the attempt bookkeeping (never to the snapshot).
    pub fn bookkeeping_mut(&mut self) -> &mut Bookkeeping {
        &mut self.bookkeeping
    }

    /// Returns true once the retry budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count() >= self.max_retries
    }

    /// Returns true if the record must not be retried yet at `now_ms`.
    ///
    /// Records that have never failed are never in backoff.
    pub fn in_backoff(&self, now_ms: u64, backoff: &Backoff) -> bool {
        let retries = self.retry_count();
        if retries == 0 {
            return false;
        }
        now_ms.saturating_sub(self.last_attempt_at()) < backoff.window_ms(retries)
    }

    /// Milliseconds until the backoff window closes, 0 if not in backoff.
    pub fn backoff_remaining(&self, now_ms: u64, backoff: &Backoff) -> u64 {
        if !self.in_backoff(now_ms, backoff) {
            return 0;
        }
        let elapsed = now_ms.saturating_sub(self.last_attempt_at());
        backoff.window_ms(self.retry_count()).saturating_sub(elapsed)
    }

    /// Key used to keep mutations of the same resource in order.
    ///
    /// The URL without query string or fragment.
    pub fn resource_key(&self) -> &str {
        let url = self.url();
        let end = url.find(['?', '#']).unwrap_or(url.len());
        &url[..end]
    }
}

/// Exponential backoff policy: `base * 2^min(n, cap_exponent)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base_ms: u64,
    pub cap_exponent: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            base_ms: 1_000,
            cap_exponent: 6,
        }
    }
}

impl Backoff {
    /// Minimum wait after the `retry_count`-th failure. Zero for no failures.
    pub fn window_ms(&self, retry_count: u32) -> u64 {
        if retry_count == 0 {
            return 0;
        }
        let exponent = retry_count.min(self.cap_exponent).min(63);
        self.base_ms.saturating_mul(1u64 << exponent)
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;

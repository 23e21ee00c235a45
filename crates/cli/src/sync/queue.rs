// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue manager: drains the durable store through the transport.
//!
//! The manager owns processing. It listens to connectivity, schedules
//! debounced processing passes, and applies the retry policy to each
//! stored record:
//!
//! ```text
//!              enqueue / online
//!   ┌──────┐ ─────────────────► ┌───────────┐  timer   ┌────────────┐
//!   │ Idle │                    │ Scheduled │ ───────► │ Processing │
//!   └──────┘ ◄───────────────── └───────────┘          └────────────┘
//!       ▲      pass finished,         │ offline              │
//!       │      store empty            ▼                      │ offline
//!       │                        ┌────────┐ ◄────────────────┘
//!       └─────────────────────── │ Paused │
//!                online          └────────┘
//! ```
//!
//! Within a pass records are sent one at a time in enqueue order. A record
//! still inside its backoff window is skipped, which relaxes strict FIFO
//! across resources; with `per_resource_order` enabled, a held-back record
//! also holds back every later record for the same resource.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use till_core::identity::QUEUE_ID_HEADER;
use till_core::{
    decode, encode, id, Backoff, ClockSource, QueuedMutation, Request, DEFAULT_MAX_RETRIES,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::connectivity::ConnectivityOracle;
use super::events::{EventBus, Invalidation, QueueEvent, Subscription};
use super::transport::{StatusClass, Transport};
use crate::error::Result;
use crate::store::{QueueStore, StoreResult};

/// Failure reason broadcast when the retry budget runs out.
pub const REASON_MAX_RETRIES: &str = "max retries exceeded";

/// Retry and scheduling policy.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Attempts a record gets before it fails permanently.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Delay before a pass triggered by enqueue or reconnect.
    pub debounce: Duration,
    /// Delay before the next pass when the last one sent something.
    pub busy_interval: Duration,
    /// Delay before the next pass when the last one only waited on backoff.
    pub idle_interval: Duration,
    /// Keep mutations of the same resource in enqueue order.
    pub per_resource_order: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
            debounce: Duration::from_millis(100),
            busy_interval: Duration::from_secs(1),
            idle_interval: Duration::from_secs(5),
            per_resource_order: true,
        }
    }
}

/// Collaborators injected into a [`QueueManager`].
pub struct QueueDeps {
    pub store: Arc<dyn QueueStore>,
    pub transport: Arc<dyn Transport>,
    pub connectivity: Arc<dyn ConnectivityOracle>,
    pub clock: Arc<dyn ClockSource>,
    /// Receives an [`Invalidation`] for every delivered mutation.
    pub invalidations: EventBus<Invalidation>,
}

/// Observable manager state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing scheduled.
    Idle,
    /// A pass is waiting on its timer.
    Scheduled,
    /// A pass is running.
    Processing,
    /// Offline; no passes run until connectivity returns.
    Paused,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueState::Idle => "idle",
            QueueState::Scheduled => "scheduled",
            QueueState::Processing => "processing",
            QueueState::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

/// Summary of one processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Records handed to the transport.
    pub attempted: usize,
    pub succeeded: usize,
    /// Records removed after a rejection or after exhausting retries.
    pub failed: usize,
    /// Records that failed and stay queued for another attempt.
    pub retried: usize,
    /// Records not attempted because of backoff or resource ordering.
    pub deferred: usize,
    /// The pass stopped early because connectivity was lost.
    pub halted: bool,
    /// Records left in the store after the pass.
    pub remaining: usize,
}

/// What happened to a single record in a pass.
enum Attempt {
    Delivered,
    Removed,
    Retrying,
    /// The record left the store before it could be sent.
    Gone,
}

struct PendingPass {
    generation: u64,
    deadline: Instant,
    token: CancellationToken,
}

struct Inner {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn ConnectivityOracle>,
    clock: Arc<dyn ClockSource>,
    invalidations: EventBus<Invalidation>,
    events: EventBus<QueueEvent>,
    config: QueueConfig,

    processing: AtomicBool,
    paused: AtomicBool,
    /// A pass was requested while one was running.
    rerun: AtomicBool,
    pending: Mutex<Option<PendingPass>>,
    generation: AtomicU64,
    /// Cancelled on dispose; parent of every timer and watcher.
    lifecycle: CancellationToken,
    last_enqueued_at: Mutex<u64>,
    seq: AtomicU64,
}

/// Owns the retry/backoff state machine over a [`QueueStore`].
///
/// Cheap to clone; clones drive the same queue.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

impl QueueManager {
    pub fn new(deps: QueueDeps, config: QueueConfig) -> Self {
        QueueManager {
            inner: Arc::new(Inner {
                store: deps.store,
                transport: deps.transport,
                connectivity: deps.connectivity,
                clock: deps.clock,
                invalidations: deps.invalidations,
                events: EventBus::new(),
                config,
                processing: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                lifecycle: CancellationToken::new(),
                last_enqueued_at: Mutex::new(0),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Starts watching connectivity and schedules a pass for records that
    /// survived a restart.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(&self) -> Result<()> {
        let pending = self.restore()?;

        let mut rx = self.inner.connectivity.subscribe();
        let online = *rx.borrow_and_update();
        self.inner.paused.store(!online, Ordering::Release);

        let manager = self.clone();
        let cancel = self.inner.lifecycle.clone();
        spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let online = *rx.borrow_and_update();
                        manager.on_connectivity(online);
                    }
                }
            }
        });

        tracing::info!(pending, online, "queue manager started");
        if online && pending > 0 {
            self.schedule(self.inner.config.debounce);
        }
        Ok(())
    }

    /// Continues enqueue timestamps after the newest stored record, so
    /// records written by an earlier process keep their place in line.
    ///
    /// Returns the number of stored records. Called by [`Self::init`].
    pub fn restore(&self) -> Result<usize> {
        let records = self.inner.store.load_all()?;
        if let Some(last) = records.iter().map(QueuedMutation::enqueued_at).max() {
            let mut guard = lock(&self.inner.last_enqueued_at);
            *guard = (*guard).max(last);
        }
        Ok(records.len())
    }

    /// Stops the connectivity watcher and cancels any scheduled pass.
    ///
    /// A pass already in flight runs to completion.
    pub fn dispose(&self) {
        self.inner.lifecycle.cancel();
        self.cancel_pending();
        tracing::debug!("queue manager disposed");
    }

    pub fn state(&self) -> QueueState {
        if self.inner.processing.load(Ordering::Acquire) {
            QueueState::Processing
        } else if self.inner.paused.load(Ordering::Acquire) {
            QueueState::Paused
        } else if lock(&self.inner.pending).is_some() {
            QueueState::Scheduled
        } else {
            QueueState::Idle
        }
    }

    /// Persists a mutation for later delivery and schedules a pass.
    ///
    /// Returns the queue id, also sent to the server as the `X-Queue-Id`
    /// header. The record is on disk before this returns; storage failures
    /// are returned to the caller.
    pub fn enqueue(&self, request: &Request) -> Result<String> {
        let store = &self.inner.store;
        let enqueued_at = self.next_enqueue_time();
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let existing: HashSet<String> = store.list_keys()?.into_iter().collect();
        let id = id::generate_unique_id(request.method, &request.url, enqueued_at, seq, |c| {
            existing.contains(c)
        });

        let mut request = request.clone();
        request.set_header(QUEUE_ID_HEADER, id.as_str());
        let encoded = encode(&request)?;
        if encoded.degraded {
            tracing::warn!(
                id = %id,
                url = %request.url,
                "request body is not text; queued without a body"
            );
        }

        store.put(QueuedMutation::new(
            id.clone(),
            encoded.snapshot,
            enqueued_at,
            self.inner.config.max_retries,
        ))?;
        tracing::debug!(id = %id, method = %request.method, url = %request.url, "queued mutation");

        self.schedule(self.inner.config.debounce);
        Ok(id)
    }

    /// Runs one processing pass now.
    ///
    /// Returns `None` without doing anything if a pass is already running.
    pub async fn process(&self) -> Option<PassReport> {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.inner.rerun.store(true, Ordering::Release);
            tracing::debug!("pass already running");
            return None;
        }

        let report = {
            let _guard = ProcessingGuard(&self.inner.processing);
            self.run_pass().await
        };

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            retried = report.retried,
            deferred = report.deferred,
            remaining = report.remaining,
            "queue pass finished"
        );
        self.schedule_follow_up(&report);
        Some(report)
    }

    /// Pending records in enqueue order.
    pub fn pending(&self) -> Result<Vec<QueuedMutation>> {
        Ok(self.inner.store.load_all()?)
    }

    /// Registers a listener for terminal outcomes.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn connectivity(&self) -> &Arc<dyn ConnectivityOracle> {
        &self.inner.connectivity
    }

    pub fn invalidations(&self) -> &EventBus<Invalidation> {
        &self.inner.invalidations
    }

    fn on_connectivity(&self, online: bool) {
        if online {
            self.inner.paused.store(false, Ordering::Release);
            tracing::info!("connectivity restored; resuming queue");
            if !self.inner.store.is_empty().unwrap_or(false) {
                self.schedule(self.inner.config.debounce);
            }
        } else {
            self.inner.paused.store(true, Ordering::Release);
            self.cancel_pending();
            tracing::info!("connectivity lost; queue paused");
        }
    }

    /// Strictly increasing enqueue timestamp, so FIFO holds even when the
    /// clock reads the same millisecond twice or steps backwards.
    fn next_enqueue_time(&self) -> u64 {
        let now = self.inner.clock.now_ms();
        let mut last = lock(&self.inner.last_enqueued_at);
        let t = now.max(last.saturating_add(1));
        *last = t;
        t
    }

    async fn run_pass(&self) -> PassReport {
        let inner = &self.inner;
        let mut report = PassReport::default();

        let records = match inner.store.load_all() {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "could not read queue");
                return report;
            }
        };

        let mut held: HashSet<String> = HashSet::new();
        for record in records {
            if !inner.connectivity.is_online() {
                tracing::info!("offline; stopping pass");
                report.halted = true;
                break;
            }

            let key = record.resource_key().to_string();
            if inner.config.per_resource_order && held.contains(&key) {
                tracing::debug!(id = record.id(), resource = %key, "held behind earlier mutation");
                report.deferred += 1;
                continue;
            }

            let now = inner.clock.now_ms();
            if record.in_backoff(now, &inner.config.backoff) {
                tracing::debug!(
                    id = record.id(),
                    retry_count = record.retry_count(),
                    wait_ms = record.backoff_remaining(now, &inner.config.backoff),
                    "in backoff"
                );
                report.deferred += 1;
                held.insert(key);
                continue;
            }

            match self.attempt(&record, now).await {
                Ok(Attempt::Delivered) => {
                    report.attempted += 1;
                    report.succeeded += 1;
                }
                Ok(Attempt::Removed) => {
                    report.attempted += 1;
                    report.failed += 1;
                }
                Ok(Attempt::Retrying) => {
                    report.attempted += 1;
                    report.retried += 1;
                    held.insert(key);
                }
                Ok(Attempt::Gone) => {}
                Err(e) => {
                    tracing::error!(id = record.id(), error = %e, "queue storage failed; stopping pass");
                    break;
                }
            }
        }

        report.remaining = inner.store.len().unwrap_or(0);
        report
    }

    async fn attempt(&self, record: &QueuedMutation, now: u64) -> StoreResult<Attempt> {
        let inner = &self.inner;
        let id = record.id();
        let url = record.url();

        if inner.store.update(id, &mut |b| b.mark_attempt(now))?.is_none() {
            return Ok(Attempt::Gone);
        }

        let request = decode(record.request_snapshot());
        let method = request.method;
        let reason = match inner.transport.send(request).await {
            Ok(response) => match response.class() {
                StatusClass::Success => {
                    if inner.store.delete(id)? {
                        tracing::debug!(id, url, status = response.status, "delivered");
                        inner.events.emit(&QueueEvent::Succeeded {
                            id: id.to_string(),
                            url: url.to_string(),
                        });
                        if method.is_mutating() {
                            inner.invalidations.emit(&Invalidation {
                                url: url.to_string(),
                            });
                        }
                    }
                    return Ok(Attempt::Delivered);
                }
                StatusClass::Rejected => {
                    let reason = format!("client error {}", response.status);
                    self.remove_failed(id, url, reason)?;
                    return Ok(Attempt::Removed);
                }
                StatusClass::Retriable => format!("server error {}", response.status),
            },
            Err(e) => e.to_string(),
        };

        let updated = inner.store.update(id, &mut |b| {
            b.record_failure();
        })?;
        match updated {
            Some(record) if record.is_exhausted() => {
                tracing::warn!(id, url, attempts = record.retry_count(), %reason, "giving up");
                self.remove_failed(id, url, REASON_MAX_RETRIES.to_string())?;
                Ok(Attempt::Removed)
            }
            Some(record) => {
                tracing::warn!(
                    id,
                    url,
                    retry_count = record.retry_count(),
                    %reason,
                    "delivery failed; will retry"
                );
                Ok(Attempt::Retrying)
            }
            None => Ok(Attempt::Gone),
        }
    }

    fn remove_failed(&self, id: &str, url: &str, reason: String) -> StoreResult<()> {
        if self.inner.store.delete(id)? {
            tracing::warn!(id, url, %reason, "mutation failed permanently");
            self.inner.events.emit(&QueueEvent::Failed {
                id: id.to_string(),
                url: url.to_string(),
                reason,
            });
        }
        Ok(())
    }

    fn schedule_follow_up(&self, report: &PassReport) {
        let config = &self.inner.config;
        if self.inner.rerun.swap(false, Ordering::AcqRel) {
            self.schedule(config.debounce);
        } else if report.remaining > 0 && !report.halted {
            let delay = if report.attempted > 0 {
                config.busy_interval
            } else {
                config.idle_interval
            };
            self.schedule(delay);
        }
    }

    /// Arms the pass timer. An earlier deadline replaces a later one; a
    /// later one is dropped, so bursts collapse into a single pass.
    fn schedule(&self, delay: Duration) {
        if self.inner.lifecycle.is_cancelled() || self.inner.paused.load(Ordering::Acquire) {
            return;
        }

        let deadline = Instant::now() + delay;
        let mut pending = lock(&self.inner.pending);
        if let Some(existing) = pending.as_ref() {
            if existing.deadline <= deadline {
                return;
            }
            existing.token.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let token = self.inner.lifecycle.child_token();
        *pending = Some(PendingPass {
            generation,
            deadline,
            token: token.clone(),
        });
        drop(pending);

        let manager = self.clone();
        spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    manager.clear_pending(generation);
                    manager.process().await;
                }
            }
        });
    }

    fn clear_pending(&self, generation: u64) {
        let mut pending = lock(&self.inner.pending);
        if pending.as_ref().is_some_and(|p| p.generation == generation) {
            *pending = None;
        }
    }

    fn cancel_pending(&self) {
        if let Some(pass) = lock(&self.inner.pending).take() {
            pass.token.cancel();
        }
    }
}

/// Clears the processing flag when a pass ends, even if it is dropped.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Spawns onto the current runtime, if there is one.
fn spawn<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => tracing::debug!("no async runtime; background task not started"),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

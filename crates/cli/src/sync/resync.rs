// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic re-fetch of canonical server state.
//!
//! Optimistic values and the queue can drift from the server (another
//! till changed a price, a queued write was rejected). The loop re-fetches
//! on a fixed period and whenever the application returns to the
//! foreground. Runs never overlap: triggers that arrive while a refetch is
//! in flight collapse into a single follow-up run.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Re-reads canonical state from the server.
///
/// Implementations must be idempotent.
pub trait Refetch: Send + Sync {
    fn refetch(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

struct Inner {
    refetch: Arc<dyn Refetch>,
    period: Duration,
    runs: AtomicU64,
    failures: AtomicU64,
    running: Mutex<Option<Running>>,
}

/// Handles to the spawned loop. Each start gets a fresh trigger so a
/// foreground request never outlives the loop it was meant for.
struct Running {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
}

/// Drives a [`Refetch`] on a timer and on demand.
#[derive(Clone)]
pub struct ResyncLoop {
    inner: Arc<Inner>,
}

impl ResyncLoop {
    pub fn new(refetch: Arc<dyn Refetch>, period: Duration) -> Self {
        ResyncLoop {
            inner: Arc::new(Inner {
                refetch,
                period,
                runs: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                running: Mutex::new(None),
            }),
        }
    }

    /// Starts the loop. The first refetch runs immediately. Calling
    /// `start` on a running loop does nothing.
    pub fn start(&self) {
        let mut running = self.inner.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());
        *running = Some(Running {
            cancel: cancel.clone(),
            trigger: Arc::clone(&trigger),
        });
        drop(running);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                    _ = trigger.notified() => {}
                }
                run_once(&inner).await;
            }
            tracing::debug!("resync loop stopped");
        });
    }

    /// Stops the loop after any in-flight refetch.
    pub fn stop(&self) {
        let running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(running) = running {
            running.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Requests a refetch now, e.g. when the app regains focus. Ignored
    /// while the loop is stopped.
    pub fn foreground(&self) {
        let running = self.inner.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = running.as_ref() {
            running.trigger.notify_one();
        }
    }

    /// Completed refetch attempts, successful or not.
    pub fn runs(&self) -> u64 {
        self.inner.runs.load(Ordering::Acquire)
    }

    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Acquire)
    }
}

async fn run_once(inner: &Inner) {
    if let Err(e) = inner.refetch.refetch().await {
        inner.failures.fetch_add(1, Ordering::AcqRel);
        tracing::warn!(error = %e, "resync failed; retrying next tick");
    }
    inner.runs.fetch_add(1, Ordering::AcqRel);
}

#[cfg(test)]
#[path = "resync_tests.rs"]
mod tests;

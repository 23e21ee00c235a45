// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use till_core::{ClockSource, Method, Request};
use tokio::sync::Semaphore;

use super::connectivity::SharedConnectivity;
use super::events::{EventBus, Invalidation, QueueEvent, Subscription};
use super::queue::{QueueConfig, QueueDeps, QueueManager};
use super::transport::{Response, Transport, TransportError, TransportResult};
use crate::store::MemoryStore;

pub const BASE: &str = "https://pos.example/api";

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

pub fn post(path: &str, body: &str) -> Request {
    Request::new(Method::Post, url(path))
        .with_header("Content-Type", "application/json")
        .with_text(body)
}

/// Scripted reply for one send.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Fail(TransportError),
}

type SendHook = Box<dyn Fn(&Request) + Send + Sync>;

/// Mock transport that replays scripted replies per URL.
///
/// URLs without a script (or whose script ran out) get the default reply,
/// which starts as 200.
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    default: Mutex<Reply>,
    sent: Mutex<Vec<Request>>,
    gate: Option<Arc<Semaphore>>,
    hook: Mutex<Option<SendHook>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            scripts: Mutex::new(HashMap::new()),
            default: Mutex::new(Reply::Status(200)),
            sent: Mutex::new(Vec::new()),
            gate: None,
            hook: Mutex::new(None),
        }
    }

    /// A transport whose sends block until [`MockTransport::release`].
    pub fn gated() -> Self {
        MockTransport {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn script(&self, url: &str, replies: impl IntoIterator<Item = Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(replies);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default.lock().unwrap() = reply;
    }

    /// Runs `hook` at the start of every send.
    pub fn on_send(&self, hook: impl Fn(&Request) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Lets `n` gated sends proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.url).collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sends_to(&self, url: &str) -> usize {
        self.sent().iter().filter(|r| r.url == url).count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| self.default.lock().unwrap().clone())
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        Box::pin(async move {
            if let Some(hook) = self.hook.lock().unwrap().as_ref() {
                hook(&request);
            }
            let reply = self.next_reply(&request.url);
            self.sent.lock().unwrap().push(request);

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            match reply {
                Reply::Status(status) => Ok(Response::new(status).with_body(format!("status {status}"))),
                Reply::Fail(e) => Err(e),
            }
        })
    }
}

/// Clock driven by the test.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Policy with timers far enough out that only explicit `process()` calls
/// run passes.
pub fn manual_config() -> QueueConfig {
    QueueConfig {
        debounce: Duration::from_secs(3600),
        busy_interval: Duration::from_secs(3600),
        idle_interval: Duration::from_secs(3600),
        ..QueueConfig::default()
    }
}

/// A queue manager wired to in-memory collaborators.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<MockTransport>,
    pub connectivity: Arc<SharedConnectivity>,
    pub clock: Arc<ManualClock>,
    pub invalidations: EventBus<Invalidation>,
    pub manager: QueueManager,
}

impl Harness {
    pub fn new(config: QueueConfig) -> Self {
        Self::with_transport(config, MockTransport::new())
    }

    pub fn with_transport(config: QueueConfig, transport: MockTransport) -> Self {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(transport);
        let connectivity = Arc::new(SharedConnectivity::new(true));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let invalidations = EventBus::new();
        let manager = QueueManager::new(
            QueueDeps {
                store: store.clone(),
                transport: transport.clone(),
                connectivity: connectivity.clone(),
                clock: clock.clone(),
                invalidations: invalidations.clone(),
            },
            config,
        );
        Harness {
            store,
            transport,
            connectivity,
            clock,
            invalidations,
            manager,
        }
    }

    /// Records every outcome broadcast by the manager.
    pub fn record_events(&self) -> (Arc<Mutex<Vec<QueueEvent>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = self.manager.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        (events, sub)
    }

    /// Records every invalidated URL.
    pub fn record_invalidations(&self) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let urls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&urls);
        let sub = self.invalidations.subscribe(move |inv| {
            sink.lock().unwrap().push(inv.url.clone());
        });
        (urls, sub)
    }
}

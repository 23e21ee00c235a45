// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod init;
pub mod queue;
pub mod send;
pub mod status;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use till_core::identity::resolve_identity;
use till_core::{ClockSource, SystemClock};

use crate::config::{find_work_dir, queue_path, Config};
use crate::env;
use crate::error::Result;
use crate::store::{JournalStore, QueueStore};
use crate::sync::{
    EventBus, Gateway, GatewayConfig, HttpTransport, QueueDeps, QueueManager, SharedConnectivity,
    Transport,
};

/// Everything a command needs to talk to the queue and the server.
pub struct Session {
    pub config: Config,
    pub work_dir: PathBuf,
    pub store: Arc<JournalStore>,
    pub connectivity: Arc<SharedConnectivity>,
    pub clock: Arc<dyn ClockSource>,
    pub gateway: Gateway,
}

impl Session {
    pub fn queue(&self) -> &QueueManager {
        self.gateway.queue()
    }
}

/// Opens a session for the work directory found from the current directory.
///
/// Connectivity starts offline when `offline` is set or `TILLSYNC_OFFLINE=1`.
pub fn open_session(offline: bool) -> Result<Session> {
    let work_dir = find_work_dir()?;
    let transport = Arc::new(HttpTransport::new()?);
    open_session_with(&work_dir, transport, offline || env::force_offline())
}

/// Opens a session over an explicit transport.
pub(crate) fn open_session_with(
    work_dir: &Path,
    transport: Arc<dyn Transport>,
    offline: bool,
) -> Result<Session> {
    let config = Config::load(work_dir)?;
    let store = Arc::new(JournalStore::open(queue_path(work_dir))?);
    let connectivity = Arc::new(SharedConnectivity::new(!offline));
    let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);

    let queue = QueueManager::new(
        QueueDeps {
            store: Arc::clone(&store) as Arc<dyn QueueStore>,
            transport,
            connectivity: Arc::clone(&connectivity) as _,
            clock: Arc::clone(&clock),
            invalidations: EventBus::new(),
        },
        config.queue.to_queue_config(),
    );
    let gateway = Gateway::new(
        GatewayConfig {
            base_url: config.server_url.clone(),
            user: resolve_identity(config.user.as_deref()),
            timeout: config.dispatch.timeout(),
        },
        queue,
    );
    let pending = gateway.queue().restore()?;
    tracing::debug!(work_dir = %work_dir.display(), offline, pending, "session opened");

    Ok(Session {
        config,
        work_dir: work_dir.to_path_buf(),
        store,
        connectivity,
        clock,
        gateway,
    })
}

/// Renders a millisecond timestamp for display.
pub(crate) fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Renders a duration in milliseconds as a short human string.
pub(crate) fn format_wait(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{}m{}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

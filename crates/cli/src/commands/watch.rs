// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running delivery: drains the queue on its own schedule and
//! re-fetches canonical state until interrupted.
//!
//! The resync endpoint doubles as the connectivity check. A transport
//! failure marks the session offline, which pauses the queue; the next
//! successful fetch resumes it.
//!
//! The fetched body is discarded. A CLI process holds no optimistic
//! values, so nothing here calls `OptimisticCoordinator::reconcile`; in
//! this binary resync only tracks whether the server is reachable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use till_core::Method;

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::sync::{Gateway, QueueEvent, Refetch, ResyncLoop, SharedConnectivity};

use super::queue::{format_event, render_drain};
use super::{open_session, Session};

/// Fetches the resync endpoint and records whether the server answered.
/// The response body is not kept.
pub(crate) struct ServerRefetch {
    gateway: Gateway,
    connectivity: Arc<SharedConnectivity>,
    endpoint: String,
}

impl ServerRefetch {
    pub(crate) fn new(session: &Session, endpoint: impl Into<String>) -> Self {
        ServerRefetch {
            gateway: session.gateway.clone(),
            connectivity: Arc::clone(&session.connectivity),
            endpoint: endpoint.into(),
        }
    }
}

impl Refetch for ServerRefetch {
    fn refetch(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let result = self
                .gateway
                .request(Method::Get, &self.endpoint, None, &[])
                .await;
            let reachable = !matches!(result, Err(Error::Transport(_) | Error::Timeout { .. }));
            if self.connectivity.set_online(reachable) {
                tracing::info!(online = reachable, "connectivity changed");
            }
            let dispatched = result?;
            tracing::debug!(endpoint = %self.endpoint, status = dispatched.status(), "resynced");
            Ok(())
        })
    }
}

pub async fn run(once: bool) -> Result<()> {
    let session = open_session(false)?;
    if once {
        println!("{}", run_once(&session).await?);
        return Ok(());
    }
    run_until_interrupted(&session).await
}

/// One drain pass, then one resync if an endpoint is configured.
pub(crate) async fn run_once(session: &Session) -> Result<String> {
    let report = session.queue().process().await.unwrap_or_default();
    session.queue().dispose();
    let mut text = render_drain(&report, &[], OutputFormat::Text)?;

    if let Some(endpoint) = &session.config.resync.endpoint {
        let refetch = ServerRefetch::new(session, endpoint.as_str());
        match refetch.refetch().await {
            Ok(()) => text.push_str(&format!("\nresynced {endpoint}")),
            Err(e) => text.push_str(&format!("\nresync failed: {e}")),
        }
    }
    Ok(text)
}

async fn run_until_interrupted(session: &Session) -> Result<()> {
    let _events = session.queue().subscribe(|event: &QueueEvent| {
        println!("{}", format_event(event));
    });
    session.queue().init()?;

    let resync = session.config.resync.endpoint.as_ref().map(|endpoint| {
        let refetch = Arc::new(ServerRefetch::new(session, endpoint.as_str()));
        ResyncLoop::new(refetch, session.config.resync.interval())
    });
    let _invalidations = resync.as_ref().map(|resync| {
        let resync = resync.clone();
        session
            .queue()
            .invalidations()
            .subscribe(move |_| resync.foreground())
    });
    if let Some(resync) = &resync {
        resync.start();
    }

    tracing::info!(
        server = %session.config.server_url,
        resync = resync.is_some(),
        "watching; press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;

    if let Some(resync) = &resync {
        resync.stop();
    }
    session.queue().dispose();
    tracing::info!("stopped");
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;

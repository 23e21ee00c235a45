// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch gateway: the single entry point for outgoing requests.
//!
//! Reads go straight to the network and fail loudly. Mutations try the
//! network first and fall back to the durable queue whenever the failure
//! is worth retrying, so a write issued offline or during an outage is
//! accepted rather than lost.

use std::sync::Arc;
use std::time::Duration;

use till_core::identity::USER_HEADER;
use till_core::{Body, Method, Request};

use super::connectivity::ConnectivityOracle;
use super::events::{EventBus, Invalidation};
use super::queue::QueueManager;
use super::transport::{Response, StatusClass, Transport};
use crate::error::{Error, Result};

/// Status reported for a request accepted into the queue.
pub const QUEUED_STATUS: u16 = 202;

/// Default ceiling on a direct attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a request left the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Delivered; the server answered with a 2xx.
    Sent(Response),
    /// Persisted for later delivery. Not yet confirmed.
    Queued { id: String },
}

impl Dispatched {
    /// HTTP-style status: the response status, or 202 when queued.
    pub fn status(&self) -> u16 {
        match self {
            Dispatched::Sent(response) => response.status,
            Dispatched::Queued { .. } => QUEUED_STATUS,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Dispatched::Queued { .. })
    }

    pub fn queue_id(&self) -> Option<&str> {
        match self {
            Dispatched::Queued { id } => Some(id),
            Dispatched::Sent(_) => None,
        }
    }
}

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Prefix for relative endpoints.
    pub base_url: String,
    /// Sent as `X-User-Id` on every request.
    pub user: String,
    pub timeout: Duration,
}

/// Decides between sending now and queueing.
#[derive(Clone)]
pub struct Gateway {
    config: GatewayConfig,
    queue: QueueManager,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn ConnectivityOracle>,
    invalidations: EventBus<Invalidation>,
}

impl Gateway {
    /// Creates a gateway sharing the queue's transport and connectivity.
    pub fn new(config: GatewayConfig, queue: QueueManager) -> Self {
        Gateway {
            transport: Arc::clone(queue.transport()),
            connectivity: Arc::clone(queue.connectivity()),
            invalidations: queue.invalidations().clone(),
            config,
            queue,
        }
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// Resolves an endpoint against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Dispatches a request.
    ///
    /// Mutations return `Queued` instead of failing when offline or when
    /// the direct attempt fails in a retriable way. A 4xx is returned as
    /// [`Error::Rejected`] for every method.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Body>,
        headers: &[(String, String)],
    ) -> Result<Dispatched> {
        let mut request = Request::new(method, self.resolve(endpoint));
        for (name, value) in headers {
            request.headers.push((name.clone(), value.clone()));
        }
        request.set_header(USER_HEADER, self.config.user.as_str());
        request.body = body;

        if method.is_mutating() && !self.connectivity.is_online() {
            tracing::debug!(method = %method, url = %request.url, "offline; queueing");
            return self.enqueue(&request);
        }

        let failure = match self.send_direct(&request).await {
            Ok(response) => match response.class() {
                StatusClass::Success => {
                    if method.is_mutating() {
                        self.invalidations.emit(&Invalidation {
                            url: request.url.clone(),
                        });
                    }
                    return Ok(Dispatched::Sent(response));
                }
                StatusClass::Rejected => {
                    return Err(Error::Rejected {
                        status: response.status,
                        body: response.body,
                    });
                }
                StatusClass::Retriable => Error::ServerFailure {
                    status: response.status,
                },
            },
            Err(e) => e,
        };

        if !method.is_mutating() {
            return Err(failure);
        }
        tracing::warn!(method = %method, url = %request.url, error = %failure, "direct send failed; queueing");
        self.enqueue(&request)
    }

    async fn send_direct(&self, request: &Request) -> Result<Response> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.transport.send(request.clone())).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout {
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn enqueue(&self, request: &Request) -> Result<Dispatched> {
        let id = self.queue.enqueue(request)?;
        Ok(Dispatched::Queued { id })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for HTTP request delivery.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP delivery through `reqwest` for production
//! - Mock transports for unit testing

use std::future::Future;
use std::pin::Pin;

use till_core::{Body, Request};

/// Error type for transport operations.
///
/// Every variant means no response was obtained, so all are retriable for
/// mutating calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No response within the transport's deadline.
    #[error("request timed out")]
    Timeout,

    /// Request could not be sent or its response could not be read.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Response obtained from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn class(&self) -> StatusClass {
        classify_status(self.status)
    }
}

/// How a response status affects delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: delivered.
    Success,
    /// 5xx, 408 and 429: worth trying again later.
    Retriable,
    /// Any other status: the server will never accept this request.
    Rejected,
}

/// Classifies an HTTP status code.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        408 | 429 | 500..=599 => StatusClass::Retriable,
        _ => StatusClass::Rejected,
    }
}

/// Transport trait for request/response delivery.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations. Sends take `&self` so a
/// single transport can be shared between the gateway and the queue.
pub trait Transport: Send + Sync {
    /// Sends a request and waits for the full response.
    fn send(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>>;
}

/// HTTP transport implementation using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh connection pool.
    pub fn new() -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        Box::pin(async move {
            let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;

            // Transport options are fetch hints; the pooled client always
            // keeps connections alive and never attaches ambient credentials.
            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder = match request.body {
                Some(Body::Text(text)) => builder.body(text),
                Some(Body::Bytes(bytes)) => builder.body(bytes),
                None => builder,
            };

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(map_reqwest_error)?;

            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionFailed(e.to_string())
    } else {
        TransportError::SendFailed(e.to_string())
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-flight request intent.
//!
//! A [`Request`] is what application code hands to the dispatch gateway. It
//! is deliberately transport-agnostic: the HTTP transport converts it into a
//! wire request, and the snapshot codec freezes it for the durable queue.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::method::Method;

/// Request body as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Textual payload (JSON, form data, plain text).
    Text(String),
    /// Raw bytes that may or may not be valid UTF-8.
    Bytes(Vec<u8>),
}

impl Body {
    /// Returns the body as text, if it can be represented as UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Returns the raw bytes of the body.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Text(text) => text.as_bytes(),
            Body::Bytes(bytes) => bytes,
        }
    }

    /// Length of the body in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport-level options that travel with a request but are not headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Send ambient credentials (cookies) with the request.
    #[serde(default)]
    pub credentials: bool,
    /// Ask the transport to keep the request alive past page/session teardown.
    #[serde(default)]
    pub keepalive: bool,
}

/// A single HTTP request intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Headers in insertion order. Names compare case-insensitively.
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub options: TransportOptions,
}

impl Request {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            options: TransportOptions::default(),
        }
    }

    /// Builder: sets a header, replacing any existing header with that name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder: attaches a textual body.
    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    /// Builder: attaches a body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: sets transport options.
    pub fn with_options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the first value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header in place. An existing header with the same name keeps
    /// its position; otherwise the header is appended.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }
}

/// Parses a `Name: value` header line.
pub fn parse_header(line: &str) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::InvalidHeader(line.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

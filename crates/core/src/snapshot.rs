// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request snapshot codec.
//!
//! A [`RequestSnapshot`] is the frozen, replayable description of a request
//! captured at enqueue time. Replaying it later must reproduce the bytes the
//! caller originally intended, so the snapshot owns copies of everything:
//! the header list is an explicit vector rather than a view of the caller's
//! request, and the body is captured as text.
//!
//! Round-trip law: `decode(&encode(r)?.snapshot)` equals `r` for method,
//! URL, header list and textual body.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::method::Method;
use crate::request::{Body, Request, TransportOptions};

/// Body as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotBody {
    /// No body was supplied, or the method does not carry one.
    Absent,
    /// Textual body, replayed verbatim.
    Text { text: String },
    /// The body could not be captured as text. Replay sends no body.
    Unencodable { len: usize },
}

impl SnapshotBody {
    /// Returns true if the body was lost at capture time.
    pub fn is_unencodable(&self) -> bool {
        matches!(self, SnapshotBody::Unencodable { .. })
    }
}

/// Frozen description of a request's intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: SnapshotBody,
    #[serde(default)]
    pub transport_options: TransportOptions,
}

impl RequestSnapshot {
    /// Returns the first value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of encoding a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub snapshot: RequestSnapshot,
    /// True when the body could not be represented as text and was replaced
    /// by the unencodable marker.
    pub degraded: bool,
}

/// Captures a request as a replayable snapshot.
///
/// The request is only borrowed, so the caller can still send it.
pub fn encode(request: &Request) -> Result<Encoded> {
    if !is_absolute_http_url(&request.url) {
        return Err(Error::InvalidUrl(request.url.clone()));
    }

    let mut degraded = false;
    let body = match (&request.body, request.method.carries_body()) {
        (Some(body), true) => match body.as_text() {
            Some(text) => SnapshotBody::Text {
                text: text.to_string(),
            },
            None => {
                degraded = true;
                SnapshotBody::Unencodable { len: body.len() }
            }
        },
        _ => SnapshotBody::Absent,
    };

    Ok(Encoded {
        snapshot: RequestSnapshot {
            url: request.url.clone(),
            method: request.method,
            headers: request.headers.clone(),
            body,
            transport_options: request.options,
        },
        degraded,
    })
}

/// Reconstructs an equivalent request from a snapshot.
pub fn decode(snapshot: &RequestSnapshot) -> Request {
    let body = match &snapshot.body {
        SnapshotBody::Text { text } => Some(Body::Text(text.clone())),
        SnapshotBody::Absent | SnapshotBody::Unencodable { .. } => None,
    };

    Request {
        method: snapshot.method,
        url: snapshot.url.clone(),
        headers: snapshot.headers.clone(),
        body,
        options: snapshot.transport_options,
    }
}

fn is_absolute_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

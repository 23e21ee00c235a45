// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::store::StoreError;
use crate::sync::TransportError;

/// All possible errors that can occur in the tillsync library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'tillsync init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("queued mutation not found: {0}")]
    MutationNotFound(String),

    /// The server refused the request with a 4xx status. Not retried.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// A direct request failed with a 5xx status.
    #[error("server failure: status {status}")]
    ServerFailure { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("queue storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl From<till_core::Error> for Error {
    fn from(e: till_core::Error) -> Self {
        match e {
            till_core::Error::InvalidMethod(_)
            | till_core::Error::InvalidUrl(_)
            | till_core::Error::InvalidHeader(_) => Error::InvalidRequest(e.to_string()),
            till_core::Error::Io(e) => Error::Io(e),
            till_core::Error::Json(e) => Error::Json(e),
            till_core::Error::CorruptedData(msg) => Error::CorruptedData(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for till-core operations.

use thiserror::Error;

/// All possible errors that can occur in till-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid method: '{0}'\n  hint: valid methods are: GET, HEAD, OPTIONS, POST, PUT, PATCH, DELETE")]
    InvalidMethod(String),

    #[error("invalid url: '{0}'\n  hint: queued requests need an absolute http:// or https:// url")]
    InvalidUrl(String),

    #[error("invalid header '{0}': expected 'Name: value'")]
    InvalidHeader(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for till-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

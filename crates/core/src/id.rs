// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation ID generation.

use sha2::{Digest, Sha256};

use crate::method::Method;

/// Prefix shared by every queued mutation id.
pub const ID_PREFIX: &str = "mut";

/// Generate a mutation ID from the request intent and enqueue time.
/// Format: `mut-{hash}` where hash is the first 8 hex chars of
/// SHA256(method + url + enqueued_at + seq).
pub fn generate_id(method: Method, url: &str, enqueued_at: u64, seq: u64) -> String {
    let input = format!("{}{}{}{}", method, url, enqueued_at, seq);
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", ID_PREFIX, short_hash)
}

/// Generate a unique ID, handling collisions by appending an incrementing suffix.
pub fn generate_unique_id<F>(method: Method, url: &str, enqueued_at: u64, seq: u64, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(method, url, enqueued_at, seq);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

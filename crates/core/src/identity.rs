// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Identity propagation.
//!
//! Every dispatched request carries the acting user's identity so the server
//! can attribute the mutation; queued requests additionally expose their
//! local queue id so callers can correlate later outcome broadcasts.

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

/// Header carrying the acting user's identity.
pub const USER_HEADER: &str = "X-User-Id";

/// Header carrying the local queue id of a queued mutation.
pub const QUEUE_ID_HEADER: &str = "X-Queue-Id";

/// Environment variable that overrides the detected identity.
pub const USER_ENV: &str = "TILLSYNC_USER";

/// Returns the identity to attribute mutations to.
///
/// Resolution order:
/// 1. The explicitly configured identity (if non-empty)
/// 2. `TILLSYNC_USER` env var
/// 3. Unix username from USER or LOGNAME env var (if not a system account)
/// 4. Fallback to "anonymous"
pub fn resolve_identity(configured: Option<&str>) -> String {
    if let Some(name) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        return name.to_string();
    }

    if let Some(name) = env_non_empty(USER_ENV) {
        return name;
    }

    if let Some(name) = get_unix_username() {
        if !is_system_account(&name) {
            return name;
        }
    }

    "anonymous".to_string()
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_unix_username() -> Option<String> {
    env_non_empty("USER").or_else(|| env_non_empty("LOGNAME"))
}

fn is_system_account(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "root" | "system" | "administrator" | "admin" | "daemon" | "nobody"
    )
}

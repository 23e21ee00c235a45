// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by the CLI are defined here
//! with typed accessor functions. The variable name constants are generated
//! by `build.rs` and live in the [`vars`] submodule. The identity variable
//! (`TILLSYNC_USER`) is read by `till_core::identity`.

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Default log filter when `TILLSYNC_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Returns the `TILLSYNC_LOG` filter directive, or the default.
pub fn log_filter() -> String {
    std::env::var(vars::TILLSYNC_LOG)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Returns `true` if `TILLSYNC_OFFLINE=1`.
pub fn force_offline() -> bool {
    std::env::var(vars::TILLSYNC_OFFLINE).is_ok_and(|v| v == "1")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.tillsync/config.toml` and includes:
//! - `server_url`: base URL that relative endpoints resolve against
//! - `user`: optional identity sent as `X-User-Id`
//! - `[queue]`, `[dispatch]`, `[resync]`: delivery policy
//!
//! Every field except `server_url` has a default, so a minimal config is a
//! single line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use till_core::{Backoff, DEFAULT_MAX_RETRIES};

use crate::error::{Error, Result};
use crate::sync::QueueConfig;

const WORK_DIR_NAME: &str = ".tillsync";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_FILE_NAME: &str = "queue.jsonl";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.tillsync/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend (`http://` or `https://`).
    pub server_url: String,
    /// Identity override. Falls back to `TILLSYNC_USER`, then the login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub resync: ResyncSettings,
}

/// Retry and scheduling policy for queued mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Attempts before a mutation fails permanently (default: 5).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff window in milliseconds; doubles per failure (default: 1000).
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Largest doubling exponent (default: 6).
    #[serde(default = "default_cap_exponent")]
    pub cap_exponent: u32,
    /// Delay before a pass after enqueue or reconnect (default: 100).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay before the next pass after one that sent something (default: 1000).
    #[serde(default = "default_busy_interval_ms")]
    pub busy_interval_ms: u64,
    /// Delay before the next pass after one that only waited (default: 5000).
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    /// Keep writes to the same resource in order (default: true).
    #[serde(default = "default_true")]
    pub per_resource_order: bool,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_backoff_ms() -> u64 {
    1_000
}

fn default_cap_exponent() -> u32 {
    6
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_busy_interval_ms() -> u64 {
    1_000
}

fn default_idle_interval_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            cap_exponent: default_cap_exponent(),
            debounce_ms: default_debounce_ms(),
            busy_interval_ms: default_busy_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            per_resource_order: true,
        }
    }
}

impl QueueSettings {
    /// Converts to the queue manager's runtime policy.
    pub fn to_queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_retries: self.max_retries,
            backoff: Backoff {
                base_ms: self.base_backoff_ms,
                cap_exponent: self.cap_exponent,
            },
            debounce: Duration::from_millis(self.debounce_ms),
            busy_interval: Duration::from_millis(self.busy_interval_ms),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
            per_resource_order: self.per_resource_order,
        }
    }
}

/// Direct send settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Ceiling on a direct attempt in milliseconds (default: 10000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DispatchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Periodic refetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncSettings {
    /// Seconds between refetches (default: 60).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Endpoint read on every resync. Resync is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for ResyncSettings {
    fn default() -> Self {
        ResyncSettings {
            interval_secs: default_interval_secs(),
            endpoint: None,
        }
    }
}

impl ResyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Config {
    /// Creates a config with default policy for the given server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is not http(s).
    pub fn new(server_url: impl Into<String>) -> Result<Self> {
        let config = Config {
            server_url: server_url.into(),
            user: None,
            queue: QueueSettings::default(),
            dispatch: DispatchSettings::default(),
            resync: ResyncSettings::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        let url = &self.server_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "invalid server_url '{url}': must start with http:// or https://"
            )));
        }
        if self.queue.max_retries == 0 {
            return Err(Error::Config("queue.max_retries must be at least 1".into()));
        }
        Ok(())
    }

    /// Loads configuration from the given `.tillsync/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the given `.tillsync/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }
}

/// Find the .tillsync directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    find_work_dir_from(&std::env::current_dir()?)
}

/// Find the .tillsync directory by walking up from `start`
pub fn find_work_dir_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

/// Path of the queue journal inside a work directory.
pub fn queue_path(work_dir: &Path) -> PathBuf {
    work_dir.join(QUEUE_FILE_NAME)
}

/// Initialize a new .tillsync directory at the given path
pub fn init_work_dir(path: &Path, server_url: &str) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    let config = Config::new(server_url)?;
    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;
    write_gitignore(&work_dir)?;

    Ok(work_dir)
}

/// Write a .gitignore file to the work directory.
///
/// The queue journal is per-device state and never shared.
pub fn write_gitignore(work_dir: &Path) -> Result<()> {
    let gitignore_path = work_dir.join(GITIGNORE_FILE_NAME);
    let content = "# Pending mutations (per device)\nqueue.jsonl\nqueue.jsonl.tmp\nqueue.lock\n";
    fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

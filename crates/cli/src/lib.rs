// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tsync - durable, offline-tolerant delivery of point-of-sale writes.
//!
//! This crate provides the functionality behind the `tillsync` CLI: a
//! journaled queue of pending mutations, a gateway that decides between
//! sending now and queueing, and the loops that drain the queue and
//! re-fetch canonical state.
//!
//! # Main Components
//!
//! - [`sync::Gateway`] - entry point for outgoing requests
//! - [`sync::QueueManager`] - retry policy and scheduled processing passes
//! - [`store::JournalStore`] - append-only, fsynced queue storage
//! - [`sync::OptimisticCoordinator`] - provisional values reconciled with outcomes
//! - [`sync::ResyncLoop`] - periodic refetch of server state
//! - [`Config`] - per-directory configuration in `.tillsync/config.toml`
//!
//! # Usage
//!
//! ```rust,ignore
//! use tsync::{find_work_dir, Config};
//!
//! let work_dir = find_work_dir()?;
//! let config = Config::load(&work_dir)?;
//! let store = Arc::new(JournalStore::open(queue_path(&work_dir))?);
//! let queue = QueueManager::new(deps, config.queue.to_queue_config());
//! queue.init()?;
//! ```

mod cli;
mod commands;
pub mod env;

pub mod config;
pub mod error;
pub mod store;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, QueueCommand};
pub use config::{find_work_dir, init_work_dir, queue_path, Config};
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. The filter comes from `TILLSYNC_LOG`.
pub fn setup_logging() {
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs a parsed command line.
pub fn run_cli(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }
    run(cli.command)
}

pub fn run(command: Command) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dispatch(command))
}

async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init { server, path } => commands::init::run(&server, path),
        Command::Send {
            method,
            endpoint,
            body,
            headers,
            offline,
            output,
        } => commands::send::run(&method, &endpoint, body, &headers, offline, output).await,
        Command::Queue(cmd) => commands::queue::run(cmd).await,
        Command::Status { output } => commands::status::run(output),
        Command::Watch { once } => commands::watch::run(once).await,
    }
}

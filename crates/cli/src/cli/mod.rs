// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse a `Name: value` header argument.
fn header_arg(s: &str) -> Result<(String, String), String> {
    till_core::request::parse_header(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "tillsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Durable, offline-tolerant delivery of point-of-sale writes")]
#[command(
    long_about = "Durable, offline-tolerant delivery of point-of-sale writes.\n\n\
    Mutations that cannot reach the server are journaled locally and replayed \
    in order, with exponential backoff, once the server is reachable again."
)]
pub struct Cli {
    /// Run as if tillsync was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize tillsync in the current directory (or specified path)
    #[command(after_help = "\
Examples:
  tillsync init --server https://pos.example/api
  tillsync init --server http://localhost:8080 --path ./store-12")]
    Init {
        /// Base URL of the backend
        #[arg(long, value_name = "URL")]
        server: String,

        /// Path to initialize (defaults to current directory)
        #[arg(long)]
        path: Option<String>,
    },

    /// Send a request, queueing mutations that cannot be delivered now
    #[command(after_help = "\
Examples:
  tillsync send GET /products
  tillsync send POST /orders -d '{\"sku\":\"A1\",\"qty\":2}'
  tillsync send PATCH /items/7 -d '{\"price\":450}' -H 'If-Match: 3'
  tillsync send DELETE /orders/19 --offline")]
    Send {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
        method: String,

        /// Endpoint, relative to the server URL or absolute
        endpoint: String,

        /// Request body
        #[arg(long, short = 'd')]
        body: Option<String>,

        /// Extra header as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H', value_parser = header_arg)]
        headers: Vec<(String, String)>,

        /// Skip the network and queue the mutation
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Inspect and drain the mutation queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Show queue and connectivity status
    Status {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Keep draining the queue and resyncing until interrupted
    Watch {
        /// Run one drain pass and one resync, then exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List pending mutations in delivery order
    List {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show one pending mutation
    Show {
        /// Queue id (mut-xxxxxxxx)
        id: String,

        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Run one delivery pass now
    Drain {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;

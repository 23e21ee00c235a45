// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use till_core::identity::resolve_identity;
use till_core::ClockSource;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::ConnectivityOracle;

use super::{format_timestamp, format_wait, open_session, Session};

#[derive(Debug, Serialize)]
struct StatusJson {
    work_dir: String,
    server_url: String,
    user: String,
    online: bool,
    pending: usize,
    in_backoff: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    oldest_enqueued_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_attempt_in_ms: Option<u64>,
}

pub fn run(output: OutputFormat) -> Result<()> {
    let session = open_session(false)?;
    println!("{}", run_impl(&session, output)?);
    Ok(())
}

/// Internal implementation that accepts a session for testing.
pub(crate) fn run_impl(session: &Session, output: OutputFormat) -> Result<String> {
    let status = collect(session)?;
    match output {
        OutputFormat::Text => {
            let mut lines = vec![
                format!("Work dir: {}", status.work_dir),
                format!("Server: {}", status.server_url),
                format!("User: {}", status.user),
                format!(
                    "Connectivity: {}",
                    if status.online { "online" } else { "offline" }
                ),
                format!(
                    "Pending: {} ({} in backoff)",
                    status.pending, status.in_backoff
                ),
            ];
            if let Some(at) = status.oldest_enqueued_at {
                lines.push(format!("Oldest: {}", format_timestamp(at)));
            }
            if let Some(wait) = status.next_attempt_in_ms {
                lines.push(format!("Next retry in: {}", format_wait(wait)));
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&status)?),
    }
}

fn collect(session: &Session) -> Result<StatusJson> {
    let pending = session.queue().pending()?;
    let now = session.clock.now_ms();
    let backoff = session.queue().config().backoff;

    let waits: Vec<u64> = pending
        .iter()
        .map(|record| record.backoff_remaining(now, &backoff))
        .filter(|wait| *wait > 0)
        .collect();

    Ok(StatusJson {
        work_dir: session.work_dir.display().to_string(),
        server_url: session.config.server_url.clone(),
        user: resolve_identity(session.config.user.as_deref()),
        online: session.connectivity.is_online(),
        pending: pending.len(),
        in_backoff: waits.len(),
        oldest_enqueued_at: pending.first().map(|record| record.enqueued_at()),
        next_attempt_in_ms: waits.iter().copied().min(),
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

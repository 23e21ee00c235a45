// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use till_core::{Body, Method};

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::Dispatched;

use super::{open_session, Session};

#[derive(Serialize)]
struct SendOutputJson<'a> {
    status: u16,
    queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

pub async fn run(
    method: &str,
    endpoint: &str,
    body: Option<String>,
    headers: &[(String, String)],
    offline: bool,
    output: OutputFormat,
) -> Result<()> {
    let method: Method = method.parse()?;
    let session = open_session(offline)?;
    let dispatched = run_impl(&session, method, endpoint, body, headers).await?;
    println!("{}", render(&dispatched, output)?);
    Ok(())
}

/// Internal implementation that accepts a session for testing.
pub(crate) async fn run_impl(
    session: &Session,
    method: Method,
    endpoint: &str,
    body: Option<String>,
    headers: &[(String, String)],
) -> Result<Dispatched> {
    session
        .gateway
        .request(method, endpoint, body.map(Body::Text), headers)
        .await
}

pub(crate) fn render(dispatched: &Dispatched, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => Ok(match dispatched {
            Dispatched::Sent(response) if response.body.is_empty() => {
                format!("{}", response.status)
            }
            Dispatched::Sent(response) => format!("{}\n{}", response.status, response.body),
            Dispatched::Queued { id } => format!("queued {} ({})", id, dispatched.status()),
        }),
        OutputFormat::Json => {
            let json = SendOutputJson {
                status: dispatched.status(),
                queued: dispatched.is_queued(),
                queue_id: dispatched.queue_id(),
                body: match dispatched {
                    Dispatched::Sent(response) => Some(response.body.as_str()),
                    Dispatched::Queued { .. } => None,
                },
            };
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex};

use serde::Serialize;
use till_core::{Backoff, ClockSource, QueuedMutation, SnapshotBody};

use crate::cli::{OutputFormat, QueueCommand};
use crate::error::{Error, Result};
use crate::store::QueueStore;
use crate::sync::{PassReport, QueueEvent};

use super::{format_timestamp, format_wait, open_session, Session};

#[derive(Serialize)]
struct PendingJson<'a> {
    #[serde(flatten)]
    record: &'a QueuedMutation,
    backoff_remaining_ms: u64,
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    id: &'a str,
    url: &'a str,
    delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct DrainJson<'a> {
    #[serde(flatten)]
    report: &'a PassReport,
    outcomes: Vec<OutcomeJson<'a>>,
}

pub async fn run(command: QueueCommand) -> Result<()> {
    let session = open_session(false)?;
    let rendered = match command {
        QueueCommand::List { output } => list(&session, output)?,
        QueueCommand::Show { id, output } => show(&session, &id, output)?,
        QueueCommand::Drain { output } => drain(&session, output).await?,
    };
    println!("{rendered}");
    Ok(())
}

pub(crate) fn list(session: &Session, output: OutputFormat) -> Result<String> {
    let pending = session.queue().pending()?;
    let now = session.clock.now_ms();
    let backoff = session.queue().config().backoff;

    match output {
        OutputFormat::Text => {
            if pending.is_empty() {
                return Ok("No pending mutations".to_string());
            }
            let lines: Vec<String> = pending
                .iter()
                .map(|record| format_line(record, now, &backoff))
                .collect();
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => {
            let json: Vec<PendingJson> = pending
                .iter()
                .map(|record| PendingJson {
                    record,
                    backoff_remaining_ms: record.backoff_remaining(now, &backoff),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

fn format_line(record: &QueuedMutation, now: u64, backoff: &Backoff) -> String {
    let snapshot = record.request_snapshot();
    let mut line = format!(
        "{}  {} {}  retries {}/{}",
        record.id(),
        snapshot.method,
        snapshot.url,
        record.retry_count(),
        record.max_retries()
    );
    let wait = record.backoff_remaining(now, backoff);
    if wait > 0 {
        line.push_str(&format!("  (next attempt in {})", format_wait(wait)));
    }
    line
}

pub(crate) fn show(session: &Session, id: &str, output: OutputFormat) -> Result<String> {
    let record = session
        .store
        .get(id)?
        .ok_or_else(|| Error::MutationNotFound(id.to_string()))?;
    let now = session.clock.now_ms();
    let backoff = session.queue().config().backoff;

    match output {
        OutputFormat::Text => {
            let snapshot = record.request_snapshot();
            let mut lines = vec![
                format!("{} {} {}", record.id(), snapshot.method, snapshot.url),
                format!("Enqueued: {}", format_timestamp(record.enqueued_at())),
                format!("Retries: {}/{}", record.retry_count(), record.max_retries()),
            ];
            if record.last_attempt_at() > 0 {
                lines.push(format!(
                    "Last attempt: {}",
                    format_timestamp(record.last_attempt_at())
                ));
            }
            let wait = record.backoff_remaining(now, &backoff);
            if wait > 0 {
                lines.push(format!("Next attempt in: {}", format_wait(wait)));
            }
            if !snapshot.headers.is_empty() {
                lines.push(String::new());
                lines.push("Headers:".to_string());
                for (name, value) in &snapshot.headers {
                    lines.push(format!("  {name}: {value}"));
                }
            }
            match &snapshot.body {
                SnapshotBody::Absent => {}
                SnapshotBody::Text { text } => {
                    lines.push(String::new());
                    lines.push("Body:".to_string());
                    lines.push(format!("  {text}"));
                }
                SnapshotBody::Unencodable { len } => {
                    lines.push(String::new());
                    lines.push(format!("Body: <{len} bytes, not replayable>"));
                }
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&PendingJson {
            record: &record,
            backoff_remaining_ms: record.backoff_remaining(now, &backoff),
        })?),
    }
}

pub(crate) async fn drain(session: &Session, output: OutputFormat) -> Result<String> {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let _subscription = session.queue().subscribe(move |event: &QueueEvent| {
        sink.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    });

    let report = session.queue().process().await.unwrap_or_default();
    session.queue().dispose();

    let outcomes = outcomes.lock().unwrap_or_else(|e| e.into_inner()).clone();
    render_drain(&report, &outcomes, output)
}

pub(crate) fn format_event(event: &QueueEvent) -> String {
    match event {
        QueueEvent::Succeeded { id, url } => format!("delivered {id} {url}"),
        QueueEvent::Failed { id, url, reason } => format!("failed {id} {url}: {reason}"),
    }
}

pub(crate) fn render_drain(
    report: &PassReport,
    outcomes: &[QueueEvent],
    output: OutputFormat,
) -> Result<String> {
    match output {
        OutputFormat::Text => {
            let mut lines: Vec<String> = outcomes.iter().map(format_event).collect();
            lines.push(format!(
                "{} attempted: {} delivered, {} failed, {} retrying, {} waiting; {} remaining",
                report.attempted,
                report.succeeded,
                report.failed,
                report.retried,
                report.deferred,
                report.remaining
            ));
            if report.halted {
                lines.push("stopped early: offline".to_string());
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => {
            let json = DrainJson {
                report,
                outcomes: outcomes
                    .iter()
                    .map(|event| OutcomeJson {
                        id: event.id(),
                        url: event.url(),
                        delivered: event.is_success(),
                        reason: match event {
                            QueueEvent::Failed { reason, .. } => Some(reason.as_str()),
                            QueueEvent::Succeeded { .. } => None,
                        },
                    })
                    .collect(),
            };
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

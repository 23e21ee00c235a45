// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use till_core::{Body, Method, Request};
use yare::parameterized;

use super::*;
use crate::commands::testing::TestContext;
use crate::sync::test_helpers::{post, url, Reply};

fn enqueue(ctx: &TestContext, request: Request) -> String {
    ctx.session.queue().enqueue(&request).unwrap()
}

#[test]
fn list_empty_queue() {
    let ctx = TestContext::new();
    assert_eq!(
        list(&ctx.session, OutputFormat::Text).unwrap(),
        "No pending mutations"
    );
    assert_eq!(list(&ctx.session, OutputFormat::Json).unwrap(), "[]");
}

#[tokio::test]
async fn list_in_enqueue_order() {
    let ctx = TestContext::offline();
    let first = enqueue(&ctx, post("/orders", "{\"qty\":1}"));
    let second = enqueue(&ctx, Request::new(Method::Delete, url("/orders/19")));

    let text = list(&ctx.session, OutputFormat::Text).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!("{first}  POST {}  retries 0/5", url("/orders"))
    );
    assert!(lines[1].starts_with(&format!("{second}  DELETE ")));
}

#[tokio::test]
async fn list_json_includes_bookkeeping() {
    let ctx = TestContext::offline();
    let id = enqueue(&ctx, post("/orders", "{}"));

    let json: serde_json::Value =
        serde_json::from_str(&list(&ctx.session, OutputFormat::Json).unwrap()).unwrap();
    let entry = &json[0];
    assert_eq!(entry["id"], id.as_str());
    assert_eq!(entry["retry_count"], 0);
    assert_eq!(entry["max_retries"], 5);
    assert_eq!(entry["backoff_remaining_ms"], 0);
    assert_eq!(entry["request_snapshot"]["method"], "POST");
}

#[test]
fn show_unknown_id() {
    let ctx = TestContext::new();
    let result = show(&ctx.session, "mut-00000000", OutputFormat::Text);
    assert!(matches!(result, Err(Error::MutationNotFound(id)) if id == "mut-00000000"));
}

#[tokio::test]
async fn show_text_lists_headers_and_body() {
    let ctx = TestContext::offline();
    let id = enqueue(
        &ctx,
        post("/orders", "{\"sku\":\"A1\"}").with_header("If-Match", "3"),
    );

    let text = show(&ctx.session, &id, OutputFormat::Text).unwrap();
    assert!(text.starts_with(&format!("{id} POST {}", url("/orders"))));
    assert!(text.contains("Retries: 0/5"));
    assert!(text.contains("  If-Match: 3"));
    assert!(text.contains(&format!("  X-Queue-Id: {id}")));
    assert!(text.contains("Body:\n  {\"sku\":\"A1\"}"));
    assert!(!text.contains("Last attempt"));
}

#[tokio::test]
async fn show_marks_unencodable_body() {
    let ctx = TestContext::offline();
    let request =
        Request::new(Method::Put, url("/images/3")).with_body(Body::Bytes(vec![0xff, 0xfe]));
    let id = enqueue(&ctx, request);

    let text = show(&ctx.session, &id, OutputFormat::Text).unwrap();
    assert!(text.contains("Body: <2 bytes, not replayable>"));
}

#[tokio::test]
async fn drain_delivers_and_reports() {
    let ctx = TestContext::offline();
    let id = enqueue(&ctx, post("/orders", "{}"));
    ctx.session.connectivity.set_online(true);

    let text = drain(&ctx.session, OutputFormat::Text).await.unwrap();

    assert_eq!(
        text,
        format!(
            "delivered {id} {}\n1 attempted: 1 delivered, 0 failed, 0 retrying, 0 waiting; 0 remaining",
            url("/orders")
        )
    );
    assert!(ctx.session.store.is_empty().unwrap());
    assert_eq!(ctx.transport.sends_to(&url("/orders")), 1);
}

#[parameterized(
    rejected = { 422, 1, 0, 0 },
    outage = { 503, 0, 1, 1 },
)]
#[test_macro(tokio::test)]
async fn drain_applies_retry_policy(status: u16, failed: usize, retried: usize, remaining: usize) {
    let ctx = TestContext::offline();
    enqueue(&ctx, post("/orders", "{}"));
    ctx.session.connectivity.set_online(true);
    ctx.transport.set_default(Reply::Status(status));

    let json: serde_json::Value = serde_json::from_str(
        &drain(&ctx.session, OutputFormat::Json).await.unwrap(),
    )
    .unwrap();

    assert_eq!(json["attempted"], 1);
    assert_eq!(json["failed"], failed);
    assert_eq!(json["retried"], retried);
    assert_eq!(json["remaining"], remaining);
    assert_eq!(ctx.session.store.len().unwrap(), remaining);
}

#[tokio::test]
async fn drain_rejection_reports_reason() {
    let ctx = TestContext::offline();
    let id = enqueue(&ctx, post("/orders", "{}"));
    ctx.session.connectivity.set_online(true);
    ctx.transport.set_default(Reply::Status(400));

    let json: serde_json::Value = serde_json::from_str(
        &drain(&ctx.session, OutputFormat::Json).await.unwrap(),
    )
    .unwrap();

    let outcome = &json["outcomes"][0];
    assert_eq!(outcome["id"], id.as_str());
    assert_eq!(outcome["delivered"], false);
    assert_eq!(outcome["reason"], "client error 400");
}

#[test]
fn render_drain_text_without_outcomes() {
    let report = PassReport {
        deferred: 2,
        remaining: 2,
        ..PassReport::default()
    };
    assert_eq!(
        render_drain(&report, &[], OutputFormat::Text).unwrap(),
        "0 attempted: 0 delivered, 0 failed, 0 retrying, 2 waiting; 2 remaining"
    );
}

#[tokio::test]
async fn drain_while_offline_halts() {
    let ctx = TestContext::offline();
    enqueue(&ctx, post("/orders", "{}"));

    let text = drain(&ctx.session, OutputFormat::Text).await.unwrap();

    assert!(text.ends_with("stopped early: offline"));
    assert_eq!(ctx.transport.send_count(), 0);
    assert_eq!(ctx.session.store.len().unwrap(), 1);
}

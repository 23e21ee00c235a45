// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn order_request() -> Request {
    Request::new(Method::Post, "https://till.example/api/orders")
        .with_header("Content-Type", "application/json")
        .with_header("X-User-Id", "cashier-7")
        .with_text(r#"{"sku":"A-100","qty":2}"#)
}

#[test]
fn roundtrip_preserves_method_url_headers_and_body() {
    let original = order_request();
    let encoded = encode(&original).unwrap();
    assert!(!encoded.degraded);

    let replayed = decode(&encoded.snapshot);
    assert_eq!(replayed, original);
}

#[test]
fn encode_does_not_consume_the_request() {
    let original = order_request();
    let _ = encode(&original).unwrap();
    // The caller still holds the full body.
    assert_eq!(
        original.body.as_ref().and_then(Body::as_text),
        Some(r#"{"sku":"A-100","qty":2}"#)
    );
}

#[test]
fn snapshot_is_independent_of_later_request_mutation() {
    let mut original = order_request();
    let encoded = encode(&original).unwrap();

    original.set_header("X-User-Id", "someone-else");
    original.body = Some(Body::Text("tampered".into()));

    assert_eq!(encoded.snapshot.header("x-user-id"), Some("cashier-7"));
    assert_eq!(
        encoded.snapshot.body,
        SnapshotBody::Text {
            text: r#"{"sku":"A-100","qty":2}"#.into()
        }
    );
}

#[test]
fn binary_body_is_marked_unencodable() {
    let req = Request::new(Method::Put, "https://till.example/api/images/4")
        .with_body(Body::Bytes(vec![0x89, 0x50, 0x4e, 0x47, 0xff]));
    let encoded = encode(&req).unwrap();

    assert!(encoded.degraded);
    assert_eq!(encoded.snapshot.body, SnapshotBody::Unencodable { len: 5 });
    assert!(encoded.snapshot.body.is_unencodable());
    assert_eq!(decode(&encoded.snapshot).body, None);
}

#[test]
fn utf8_bytes_are_captured_as_text() {
    let req = Request::new(Method::Patch, "https://till.example/api/stock/9")
        .with_body(Body::Bytes(b"qty=3".to_vec()));
    let encoded = encode(&req).unwrap();
    assert!(!encoded.degraded);
    assert_eq!(
        encoded.snapshot.body,
        SnapshotBody::Text {
            text: "qty=3".into()
        }
    );
}

#[test]
fn body_is_dropped_for_methods_without_one() {
    let req = Request::new(Method::Get, "https://till.example/api/orders").with_text("ignored");
    let encoded = encode(&req).unwrap();
    assert_eq!(encoded.snapshot.body, SnapshotBody::Absent);
}

#[test]
fn transport_options_survive_roundtrip() {
    let options = TransportOptions {
        credentials: true,
        keepalive: true,
    };
    let req = order_request().with_options(options);
    let snapshot = encode(&req).unwrap().snapshot;
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: RequestSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(decode(&back).options, options);
}

#[parameterized(
    relative = { "/api/orders" },
    no_scheme = { "till.example/api" },
    ftp = { "ftp://till.example/file" },
    empty_host = { "https:///api" },
    empty = { "" },
)]
fn encode_rejects_non_absolute_urls(url: &str) {
    let req = Request::new(Method::Post, url);
    assert!(matches!(encode(&req), Err(Error::InvalidUrl(_))));
}

#[test]
fn snapshot_json_shape_is_stable() {
    let snapshot = encode(&order_request()).unwrap().snapshot;
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["method"], "POST");
    assert_eq!(value["body"]["kind"], "text");
    assert_eq!(value["headers"][0][0], "Content-Type");
}

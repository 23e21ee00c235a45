// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

fn stdout(temp: &TempDir, args: &[&str]) -> String {
    let output = tillsync()
        .args(args)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?} failed", args);
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn offline_send_is_queued() {
    let temp = init_temp();

    tillsync()
        .args(["send", "POST", "/orders", "-d", "{\"qty\":2}", "--offline"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^queued mut-[0-9a-f]{8} \(202\)\n$").unwrap());

    assert!(temp.path().join(".tillsync/queue.jsonl").exists());
}

#[test]
fn offline_env_forces_queueing() {
    let temp = init_temp();

    tillsync()
        .args(["send", "DELETE", "/orders/19"])
        .env("TILLSYNC_OFFLINE", "1")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("queued mut-"));
}

#[test]
fn unreachable_server_queues_mutation() {
    let temp = init_temp();

    tillsync()
        .args(["send", "PUT", "/items/7", "-d", "{}"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("queued mut-"));
}

#[test]
fn unreachable_server_fails_read() {
    let temp = init_temp();

    tillsync()
        .args(["send", "GET", "/products"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));

    let listed = stdout(&temp, &["queue", "list"]);
    assert_eq!(listed.trim(), "No pending mutations");
}

#[test]
fn invalid_method_is_rejected() {
    let temp = init_temp();

    tillsync()
        .args(["send", "FETCH", "/orders"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("FETCH"));
}

#[test]
fn queue_survives_between_runs_in_order() {
    let temp = init_temp();
    let first = queue_offline(&temp, "POST", "/orders", "{\"qty\":1}");
    let second = queue_offline(&temp, "PATCH", "/items/7", "{\"price\":450}");

    let listed = stdout(&temp, &["queue", "list", "-o", "json"]);
    let json: serde_json::Value = serde_json::from_str(&listed).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert!(json[0]["enqueued_at"].as_u64() < json[1]["enqueued_at"].as_u64());
}

#[test]
fn queue_show_prints_snapshot() {
    let temp = init_temp();
    let id = queue_offline(&temp, "POST", "/orders", "{\"sku\":\"A1\"}");

    tillsync()
        .args(["queue", "show", &id])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{UNREACHABLE}/orders")))
        .stdout(predicate::str::contains("X-User-Id: till-7"))
        .stdout(predicate::str::contains(format!("X-Queue-Id: {id}")))
        .stdout(predicate::str::contains("{\"sku\":\"A1\"}"));
}

#[test]
fn queue_show_unknown_id_fails() {
    let temp = init_temp();

    tillsync()
        .args(["queue", "show", "mut-00000000"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn drain_against_unreachable_server_retries() {
    let temp = init_temp();
    let id = queue_offline(&temp, "POST", "/orders", "{}");

    let drained = stdout(&temp, &["queue", "drain", "-o", "json"]);
    let json: serde_json::Value = serde_json::from_str(&drained).unwrap();
    assert_eq!(json["attempted"], 1);
    assert_eq!(json["retried"], 1);
    assert_eq!(json["remaining"], 1);

    let shown = stdout(&temp, &["queue", "show", &id, "-o", "json"]);
    let record: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(record["retry_count"], 1);
    assert!(record["backoff_remaining_ms"].as_u64().unwrap() > 0);
}

#[test]
fn status_summarizes_queue() {
    let temp = init_temp();
    queue_offline(&temp, "POST", "/orders", "{}");

    tillsync()
        .args(["status"])
        .env("TILLSYNC_OFFLINE", "1")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("User: till-7"))
        .stdout(predicate::str::contains("Connectivity: offline"))
        .stdout(predicate::str::contains("Pending: 1 (0 in backoff)"));
}

#[test]
fn watch_once_drains() {
    let temp = init_temp();
    queue_offline(&temp, "POST", "/orders", "{}");

    tillsync()
        .args(["watch", "--once"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 attempted"))
        .stdout(predicate::str::contains("1 retrying"));
}

#[test]
fn send_refuses_while_another_process_holds_the_queue() {
    use fs2::FileExt;

    let temp = init_temp();
    queue_offline(&temp, "POST", "/orders", "{}");

    let lock = std::fs::File::open(temp.path().join(".tillsync/queue.lock")).unwrap();
    lock.try_lock_exclusive().unwrap();

    tillsync()
        .args(["send", "POST", "/orders", "-d", "{}", "--offline"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("in use by another process"));

    lock.unlock().unwrap();
    let listing = stdout(&temp, &["queue", "list"]);
    assert_eq!(listing.matches("mut-").count(), 1);
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens on the discard port, so every send is refused.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub fn tillsync() -> Command {
    let mut cmd = cargo_bin_cmd!("tillsync");
    cmd.env_remove("TILLSYNC_OFFLINE")
        .env_remove("TILLSYNC_LOG")
        .env("TILLSYNC_USER", "till-7");
    cmd
}

/// Helper to create an initialized temp directory pointing at an
/// unreachable server.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    tillsync()
        .arg("init")
        .arg("--server")
        .arg(UNREACHABLE)
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to queue a mutation offline and return its queue id
pub fn queue_offline(temp: &TempDir, method: &str, endpoint: &str, body: &str) -> String {
    let output = tillsync()
        .args(["send", method, endpoint, "-d", body, "--offline"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .find(|s| s.starts_with("mut-"))
        .unwrap()
        .to_string()
}

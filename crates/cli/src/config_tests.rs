// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn test_init_and_load_config() {
    let temp = TempDir::new().unwrap();
    let work_dir = init_work_dir(temp.path(), "https://pos.example/api").unwrap();

    let config = Config::load(&work_dir).unwrap();
    assert_eq!(config.server_url, "https://pos.example/api");
    assert_eq!(config.user, None);
    assert_eq!(config.queue, QueueSettings::default());
    assert_eq!(config.dispatch.timeout_ms, 10_000);
}

#[test]
fn test_init_writes_gitignore() {
    let temp = TempDir::new().unwrap();
    let work_dir = init_work_dir(temp.path(), "http://localhost:8080").unwrap();

    let gitignore = fs::read_to_string(work_dir.join(".gitignore")).unwrap();
    assert!(gitignore.contains("queue.jsonl"));
    assert!(gitignore.contains("queue.lock"));
}

#[test]
fn test_already_initialized() {
    let temp = TempDir::new().unwrap();
    init_work_dir(temp.path(), "http://localhost:8080").unwrap();

    let result = init_work_dir(temp.path(), "http://localhost:8080");
    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("already initialized"));
    }
}

#[test]
fn test_init_rejects_bad_url_without_creating_dir() {
    let temp = TempDir::new().unwrap();
    let result = init_work_dir(temp.path(), "ftp://files.example");
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!temp.path().join(".tillsync").exists());
}

#[parameterized(
    https = { "https://pos.example", true },
    http = { "http://127.0.0.1:3000/api", true },
    ws = { "ws://pos.example", false },
    bare = { "pos.example", false },
    empty = { "", false },
)]
fn test_server_url_validation(url: &str, ok: bool) {
    assert_eq!(Config::new(url).is_ok(), ok);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config: Config = toml::from_str("server_url = \"https://pos.example\"\n").unwrap();
    assert_eq!(config.queue.max_retries, 5);
    assert_eq!(config.queue.base_backoff_ms, 1_000);
    assert!(config.queue.per_resource_order);
    assert_eq!(config.resync.interval_secs, 60);
    assert_eq!(config.resync.endpoint, None);
}

#[test]
fn test_partial_sections_fill_defaults() {
    let toml = r#"
server_url = "https://pos.example"
user = "cashier-2"

[queue]
max_retries = 8
per_resource_order = false

[resync]
endpoint = "/inventory"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.user.as_deref(), Some("cashier-2"));
    assert_eq!(config.queue.max_retries, 8);
    assert!(!config.queue.per_resource_order);
    assert_eq!(config.queue.debounce_ms, 100);
    assert_eq!(config.resync.endpoint.as_deref(), Some("/inventory"));
    assert_eq!(config.resync.interval_secs, 60);
}

#[test]
fn test_load_rejects_zero_retries() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "server_url = \"https://pos.example\"\n[queue]\nmax_retries = 0\n",
    )
    .unwrap();

    let err = Config::load(temp.path()).unwrap_err();
    assert!(err.to_string().contains("max_retries"));
}

#[test]
fn test_save_round_trips() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::new("https://pos.example").unwrap();
    config.user = Some("manager".into());
    config.resync.endpoint = Some("/stock".into());
    config.save(temp.path()).unwrap();

    assert_eq!(Config::load(temp.path()).unwrap(), config);
}

#[test]
fn test_queue_settings_convert() {
    let settings = QueueSettings {
        max_retries: 3,
        base_backoff_ms: 250,
        cap_exponent: 4,
        debounce_ms: 10,
        busy_interval_ms: 20,
        idle_interval_ms: 30,
        per_resource_order: false,
    };
    let config = settings.to_queue_config();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.backoff.window_ms(1), 500);
    assert_eq!(config.backoff.window_ms(10), 250 * 16);
    assert_eq!(config.debounce, Duration::from_millis(10));
    assert_eq!(config.idle_interval, Duration::from_millis(30));
    assert!(!config.per_resource_order);
}

#[test]
fn test_find_work_dir_walks_up() {
    let temp = TempDir::new().unwrap();
    let work_dir = init_work_dir(temp.path(), "https://pos.example").unwrap();
    let nested = temp.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    assert_eq!(find_work_dir_from(&nested).unwrap(), work_dir);
}

#[test]
fn test_find_work_dir_not_initialized() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
        find_work_dir_from(temp.path()),
        Err(Error::NotInitialized)
    ));
}

#[test]
fn test_resync_interval_never_zero() {
    let settings = ResyncSettings {
        interval_secs: 0,
        endpoint: None,
    };
    assert_eq!(settings.interval(), Duration::from_secs(1));
}

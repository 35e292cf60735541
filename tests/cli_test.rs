//! Binary-level tests: argument handling, exit codes, and output.

mod common;

use std::time::Duration;

use assert_cmd::Command;
use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use serde_json::Value;

use gswatch::core::models::InstanceState;
use gswatch::core::scanner::{MODELS_PATH, instance_path};
use gswatch::test_utils::{TestDir, make_test_config_toml, make_test_instance};

use common::fixtures::MockGpuStack;

const GSWATCH_ENV: &[&str] = &[
    "GSWATCH_URL",
    "GSWATCH_USERNAME",
    "GSWATCH_PASSWORD",
    "GSWATCH_INTERVAL",
    "GSWATCH_TIMEOUT",
    "GSWATCH_MAX_RETRIES",
    "GSWATCH_RETRY_DELAY",
    "GSWATCH_NOTIFY_URL",
    "GSWATCH_LOG",
    "GSWATCH_LOG_FORMAT",
    "GSWATCH_LOG_FILE",
    "RUST_LOG",
];

/// A command isolated from the caller's environment and config file.
fn gswatch(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("gswatch").unwrap();
    for key in GSWATCH_ENV {
        cmd.env_remove(key);
    }
    cmd.env("GSWATCH_CONFIG", config);
    cmd
}

/// The daemon as a child process, for tests that signal it.
fn gswatch_process(config: &std::path::Path) -> std::process::Command {
    let mut cmd = std::process::Command::cargo_bin("gswatch").unwrap();
    for key in GSWATCH_ENV {
        cmd.env_remove(key);
    }
    cmd.env("GSWATCH_CONFIG", config)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TestDir::new();
    gswatch(&dir.file_path("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn missing_password_is_a_config_error() {
    let dir = TestDir::new();
    gswatch(&dir.file_path("config.toml"))
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing password"));
}

#[test]
fn out_of_range_interval_is_rejected() {
    let dir = TestDir::new();
    gswatch(&dir.file_path("config.toml"))
        .args(["check", "--password", "x", "--interval", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", "[api\nbase_url = ");
    gswatch(&config)
        .args(["check", "--password", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn unreachable_server_fails_check() {
    let dir = TestDir::new();
    gswatch(&dir.file_path("config.toml"))
        .args([
            "check",
            "--url",
            "http://127.0.0.1:9",
            "--password",
            "x",
            "--timeout",
            "2",
        ])
        .assert()
        .failure()
        .code(predicate::ne(0).and(predicate::ne(3)));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_login_exits_with_auth_code() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_status(401).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    gswatch(&config)
        .arg("check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("login rejected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn check_reports_visible_models() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_ok().await;
    mock.mount_models(&[1, 2, 3]).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    gswatch(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 model(s) visible"));
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_scan_prints_json_report() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_ok().await;
    mock.mount_models(&[1]).await;
    mock.mount_instances(
        1,
        &[
            make_test_instance(2, 1, InstanceState::Running),
            make_test_instance(3, 1, InstanceState::Error),
        ],
    )
    .await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    let output = gswatch(&config)
        .args(["scan", "--dry-run", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["models"], 1);
    assert_eq!(report["instances"], 2);
    assert_eq!(report["error_instances"], serde_json::json!([3]));
    assert_eq!(report["skipped"], serde_json::json!([3]));
    assert_eq!(report["deleted"], serde_json::json!([]));
    assert_eq!(mock.count("DELETE", &instance_path(3)).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_deletes_and_prints_summary() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_ok().await;
    mock.mount_models(&[1]).await;
    mock.mount_instances(1, &[make_test_instance(3, 1, InstanceState::Error)])
        .await;
    mock.mount_delete(3, 200).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    gswatch(&config)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted: 3"));
    assert_eq!(mock.count("DELETE", &instance_path(3)).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn run_exits_with_auth_code_when_startup_login_is_rejected() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_status(401).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    gswatch(&config)
        .timeout(Duration::from_secs(10))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("login rejected"));
    assert_eq!(mock.count("GET", MODELS_PATH).await, 0);
}

#[cfg(unix)]
#[allow(unsafe_code)]
#[tokio::test(flavor = "multi_thread")]
async fn run_exits_cleanly_on_sigterm() {
    let mock = MockGpuStack::start().await;
    mock.mount_login_ok().await;
    mock.mount_models(&[]).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&mock.uri()));

    let mut child = gswatch_process(&config).spawn().unwrap();

    // Wait for the first scan so the signal handler is installed.
    for _ in 0..200 {
        if mock.count("GET", MODELS_PATH).await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(mock.count("GET", MODELS_PATH).await > 0, "daemon never scanned");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let pid = libc::pid_t::try_from(child.id()).unwrap();
    // SAFETY: `pid` is our own child process, which has not been reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    assert_eq!(rc, 0);

    let mut status = None;
    for _ in 0..200 {
        if let Some(exit) = child.try_wait().unwrap() {
            status = Some(exit);
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let Some(status) = status else {
        child.kill().ok();
        panic!("daemon did not exit after SIGTERM");
    };
    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(status.code(), Some(0), "stderr: {stderr}");
    assert!(stderr.contains("Shutdown complete"), "stderr: {stderr}");
}

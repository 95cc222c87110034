//! Integration tests for the supervision core
//!
//! These drive real `sh` subprocesses with tiny monitoring windows. A marker
//! file written by the secondary command is used to assert whether the theme
//! check ever ran.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]

use serial_test::serial;
use std::path::Path;
use std::time::{Duration, Instant};
use themegate_config::Config;
use themegate_engine::supervise::{Supervisor, Verdict};
use themegate_engine::Error;

/// Config with fast timings, a harmless high port, and marker-writing
/// secondary command
fn test_config(dev: &str, check: &str) -> Config {
    Config::from_toml_str(&format!(
        r#"
[commands]
dev = {dev:?}
check = {check:?}

[monitor]
port = 65533
timeout_ms = 2000
poll_interval_ms = 20
grace_ms = 10
"#
    ))
    .unwrap()
}

fn check_cmd(marker: &Path) -> String {
    format!("sh -c 'touch {}'", marker.display())
}

#[test]
#[serial]
fn error_signature_blocks_and_skips_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'echo starting; echo Error: something exploded; sleep 5'",
        &check_cmd(&marker),
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::BlockedByError);
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|line| line.contains("Error: something exploded")),
        "diagnostics should contain the matching line: {:?}",
        outcome.diagnostics
    );
    assert!(!marker.exists(), "secondary must never run after an error");
}

#[test]
#[serial]
fn repeated_signatures_still_yield_one_blocked_verdict() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'for i in 1 2 3 4 5; do echo error $i; done; sleep 5'",
        &check_cmd(&marker),
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::BlockedByError);
    assert!(!marker.exists());
}

#[test]
#[serial]
fn clean_exit_runs_secondary_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'echo server warmed up; exit 0'",
        &check_cmd(&marker),
    );

    let start = Instant::now();
    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::Allowed);
    assert!(marker.exists(), "secondary should run after a clean exit");
    // No need to wait out the 2s window when the task exits on its own
    assert!(
        start.elapsed() < Duration::from_millis(1500),
        "clean exit should not wait for the timeout"
    );
}

#[test]
#[serial]
fn nonzero_exit_blocks_without_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'echo build tooling missing; exit 3'",
        &check_cmd(&marker),
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::BlockedByExitCode(3));
    assert!(!marker.exists());
    // No signature fired, so the whole buffer is the diagnostic
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|line| line.contains("build tooling missing")),
        "buffered output should be surfaced on a nonzero exit"
    );
}

#[test]
#[serial]
fn timeout_is_a_pass_and_chains_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    // Quiet long-running server, far outliving the 2s window
    let config = test_config("sh -c 'sleep 30'", &check_cmd(&marker));

    let start = Instant::now();
    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::Allowed);
    assert!(marker.exists(), "timeout is a pass, secondary must run");
    // Window is 2s; the sleep must have been killed, not waited out
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
#[serial]
fn timeout_returns_promptly_when_children_hold_the_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    // The background sleep outlives the shell that spawned it and keeps the
    // merged output pipe open long after the kill lands.
    let config = test_config("sh -c 'sleep 30 & sleep 30'", &check_cmd(&marker));

    let start = Instant::now();
    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::Allowed);
    assert!(marker.exists(), "timeout is a pass, secondary must run");
    // The open pipe must not delay the verdict past the window
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
#[serial]
fn secondary_failure_blocks_with_its_output() {
    let config = test_config(
        "sh -c 'exit 0'",
        "sh -c 'echo 23 offenses detected; exit 2'",
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::BlockedBySecondaryCheck(Some(2)));
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|line| line.contains("23 offenses detected")),
        "buffered theme check output should be surfaced"
    );
}

#[test]
#[serial]
fn primary_launch_failure_is_an_error_not_a_verdict() {
    let config = test_config("definitely-not-a-real-program-zzz", "sh -c 'exit 0'");

    let err = Supervisor::new(&config).unwrap().run().unwrap_err();
    assert!(matches!(err, Error::Launch { ref task, .. } if task == "dev server"));
}

#[test]
#[serial]
fn secondary_launch_failure_is_an_error() {
    let config = test_config("sh -c 'exit 0'", "also-not-a-real-program-zzz");

    let err = Supervisor::new(&config).unwrap().run().unwrap_err();
    assert!(matches!(err, Error::Launch { ref task, .. } if task == "theme check"));
}

#[test]
#[serial]
fn benign_output_passes_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'echo warning: deprecated flag; echo serving on 9292; exit 0'",
        &check_cmd(&marker),
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::Allowed);
    assert!(marker.exists());
}

#[test]
#[serial]
fn stderr_is_merged_into_the_scanned_stream() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("check-ran");

    let config = test_config(
        "sh -c 'echo EADDRINUSE :::9292 1>&2; sleep 5'",
        &check_cmd(&marker),
    );

    let outcome = Supervisor::new(&config).unwrap().run().unwrap();

    assert_eq!(outcome.verdict, Verdict::BlockedByError);
    assert!(!marker.exists());
}

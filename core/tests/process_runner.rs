#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{sh, wait_gone};
use maestro_core::api::{
    CancelToken, ExitKind, LaunchLimits, ProcessRunner, ResolvedCommand, StageStatus,
    TokioProcessRunner,
};

fn limits() -> LaunchLimits {
    LaunchLimits::default()
}

#[tokio::test]
async fn captures_streams_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = TokioProcessRunner::new()
        .run(
            &sh("echo out; echo err >&2; exit 3", dir.path()),
            &limits(),
            &CancelToken::new(),
        )
        .await;

    assert_eq!(outcome.kind, ExitKind::Exited(3));
    assert_eq!(outcome.status(), StageStatus::Failed);
    assert_eq!(outcome.stdout, "out\n");
    assert_eq!(outcome.stderr, "err\n");
    assert!(!outcome.stdout_truncated);
}

#[tokio::test]
async fn zero_exit_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = TokioProcessRunner::new()
        .run(&sh("true", dir.path()), &limits(), &CancelToken::new())
        .await;
    assert_eq!(outcome.exit_code(), Some(0));
    assert_eq!(outcome.status(), StageStatus::Succeeded);
}

#[tokio::test]
async fn workdir_and_env_come_from_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let command = sh("printf '%s\\n' \"$MAESTRO_TEST_VAR\"; pwd -P", dir.path())
        .env("MAESTRO_TEST_VAR", "from-stage");
    let outcome = TokioProcessRunner::new()
        .run(&command, &limits(), &CancelToken::new())
        .await;

    let expected_dir = std::fs::canonicalize(dir.path()).unwrap();
    assert_eq!(
        outcome.stdout,
        format!("from-stage\n{}\n", expected_dir.display())
    );
}

#[tokio::test]
async fn capture_is_capped_but_process_completes() {
    let dir = tempfile::tempdir().unwrap();
    let limits = LaunchLimits {
        capture_bytes: 16,
        ..LaunchLimits::default()
    };
    let outcome = TokioProcessRunner::new()
        .run(
            &sh("head -c 100000 /dev/zero | tr '\\0' a; echo done >&2", dir.path()),
            &limits,
            &CancelToken::new(),
        )
        .await;

    assert_eq!(outcome.exit_code(), Some(0));
    assert_eq!(outcome.stdout, "a".repeat(16));
    assert!(outcome.stdout_truncated);
    assert_eq!(outcome.stderr, "done\n");
    assert!(!outcome.stderr_truncated);
}

#[tokio::test]
async fn missing_program_is_a_failed_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let command = ResolvedCommand::new("/definitely/not/a/real/program", dir.path());
    let outcome = TokioProcessRunner::new()
        .run(&command, &limits(), &CancelToken::new())
        .await;

    assert!(matches!(outcome.kind, ExitKind::SpawnFailed(_)));
    assert_eq!(outcome.status(), StageStatus::Failed);
    assert!(outcome.stderr.contains("failed to spawn"));
}

#[tokio::test]
async fn timeout_kills_the_whole_process_tree() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let script = format!("sleep 5 & echo $! > {}; wait", pid_file.display());
    let limits = LaunchLimits {
        timeout: Some(Duration::from_secs(1)),
        ..LaunchLimits::default()
    };

    let started = Instant::now();
    let outcome = TokioProcessRunner::new()
        .run(&sh(&script, dir.path()), &limits, &CancelToken::new())
        .await;

    assert_eq!(outcome.kind, ExitKind::TimedOut);
    assert_eq!(outcome.status(), StageStatus::TimedOut);
    assert_eq!(outcome.exit_code(), None);
    assert!(started.elapsed() < Duration::from_secs(4));

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(
        wait_gone(pid, Duration::from_secs(2)).await,
        "background child {pid} survived the timeout"
    );
}

fn read_pid(path: &std::path::Path) -> i32 {
    std::fs::read_to_string(path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

fn graceful_limits() -> LaunchLimits {
    LaunchLimits {
        timeout: Some(Duration::from_secs(1)),
        kill_grace: Duration::from_millis(300),
        ..LaunchLimits::default()
    }
}

#[tokio::test]
async fn timeout_with_grace_sends_term_first() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let marker = dir.path().join("terminated");
    let script = format!(
        "trap 'echo term > {}; exit 0' TERM; sleep 5 & echo $! > {}; wait",
        marker.display(),
        pid_file.display()
    );

    let outcome = TokioProcessRunner::new()
        .run(&sh(&script, dir.path()), &graceful_limits(), &CancelToken::new())
        .await;

    assert_eq!(outcome.kind, ExitKind::TimedOut);
    assert!(marker.exists(), "TERM handler did not run");
    let pid = read_pid(&pid_file);
    assert!(
        wait_gone(pid, Duration::from_secs(2)).await,
        "background child {pid} survived the timeout"
    );
}

#[tokio::test]
async fn timeout_with_grace_kills_a_tree_that_ignores_term() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    // The ignored disposition is inherited by the background sleep.
    let script = format!(
        "trap '' TERM; sleep 5 & echo $! > {}; wait",
        pid_file.display()
    );

    let started = Instant::now();
    let outcome = TokioProcessRunner::new()
        .run(&sh(&script, dir.path()), &graceful_limits(), &CancelToken::new())
        .await;

    assert_eq!(outcome.kind, ExitKind::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(4));
    let pid = read_pid(&pid_file);
    assert!(
        wait_gone(pid, Duration::from_secs(2)).await,
        "background child {pid} survived SIGKILL"
    );
}

#[tokio::test]
async fn cancellation_terminates_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = TokioProcessRunner::new()
        .run(&sh("sleep 5", dir.path()), &limits(), &cancel)
        .await;

    assert_eq!(outcome.kind, ExitKind::Cancelled);
    assert_eq!(outcome.status(), StageStatus::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn cancelled_token_prevents_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = TokioProcessRunner::new()
        .run(
            &sh(&format!("touch {}", marker.display()), dir.path()),
            &limits(),
            &cancel,
        )
        .await;

    assert_eq!(outcome.kind, ExitKind::Cancelled);
    assert!(!marker.exists());
}

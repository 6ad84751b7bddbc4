use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::executor::CancelToken;
use crate::util::RingBytes;

use super::abort::{kill_group, terminate_tree};
use super::io_pump::{pump_stderr, pump_stdout};
use super::traits::ProcessRunner;
use super::types::{ExitKind, LaunchLimits, ProcessOutcome, ResolvedCommand};

/// How long to wait for the output pipes to reach EOF after the child exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Deadline,
    Cancelled,
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn name(&self) -> &str {
        "tokio-process"
    }

    #[tracing::instrument(name = "runner.process", skip_all, fields(program = %command.program))]
    async fn run(
        &self,
        command: &ResolvedCommand,
        limits: &LaunchLimits,
        cancel: &CancelToken,
    ) -> ProcessOutcome {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return ProcessOutcome::cancelled(0);
        }

        let mut child = match build_command(command).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, "spawn failed");
                return ProcessOutcome::spawn_failed(
                    format!("failed to spawn `{}`: {e}", command.program),
                    elapsed_ms(started),
                );
            }
        };
        let pid = child.id();
        tracing::debug!(pid, command = %command.display(), "process spawned");

        let stdout_ring = RingBytes::new(limits.capture_bytes);
        let stderr_ring = RingBytes::new(limits.capture_bytes);
        let stdout_task = child
            .stdout
            .take()
            .map(|rd| pump_stdout(rd, stdout_ring.clone(), limits.passthrough));
        let stderr_task = child
            .stderr
            .take()
            .map(|rd| pump_stderr(rd, stderr_ring.clone(), limits.passthrough));

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            _ = deadline(limits.timeout) => Waited::Deadline,
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        let kind = match waited {
            Waited::Exited(Ok(status)) => match status.code() {
                Some(code) => ExitKind::Exited(code),
                None => ExitKind::Signaled,
            },
            Waited::Exited(Err(e)) => {
                terminate_tree(&mut child, limits.kill_grace).await;
                ExitKind::SpawnFailed(format!("waiting on `{}` failed: {e}", command.program))
            }
            Waited::Deadline => {
                tracing::info!(pid, timeout = ?limits.timeout, "timeout expired, terminating");
                terminate_tree(&mut child, limits.kill_grace).await;
                ExitKind::TimedOut
            }
            Waited::Cancelled => {
                tracing::info!(pid, "cancelled, terminating");
                terminate_tree(&mut child, limits.kill_grace).await;
                ExitKind::Cancelled
            }
        };

        let drain = matches!(kind, ExitKind::Exited(_) | ExitKind::Signaled);
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            finish_pump(task, drain, DRAIN_TIMEOUT, pid).await;
        }

        let mut outcome = ProcessOutcome::new(kind, elapsed_ms(started));
        outcome.stdout = stdout_ring.to_string_lossy();
        outcome.stderr = stderr_ring.to_string_lossy();
        outcome.stdout_truncated = stdout_ring.is_truncated();
        outcome.stderr_truncated = stderr_ring.is_truncated();
        if let ExitKind::SpawnFailed(msg) = &outcome.kind {
            if outcome.stderr.is_empty() {
                outcome.stderr = msg.clone();
            }
        }
        outcome
    }
}

fn build_command(command: &ResolvedCommand) -> Command {
    let mut std_cmd = std::process::Command::new(&command.program);
    std_cmd
        .args(&command.args)
        .current_dir(&command.workdir)
        .envs(&command.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New group so the whole tree can be signalled on timeout.
        std_cmd.process_group(0);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(t) => tokio::time::sleep(t).await,
        None => std::future::pending::<()>().await,
    }
}

/// Wait for a pump to hit EOF, or stop it.
///
/// After a timeout or cancellation no further output is collected. After a
/// normal exit, descendants that keep the pipe open are killed once the
/// drain window passes.
async fn finish_pump(
    mut task: JoinHandle<Result<u64, RunnerError>>,
    drain: bool,
    drain_timeout: Duration,
    pid: Option<u32>,
) {
    if !drain {
        task.abort();
        return;
    }

    match tokio::time::timeout(drain_timeout, &mut task).await {
        Ok(Ok(Ok(_))) => {}
        Ok(Ok(Err(e))) => tracing::warn!(error = %e, "output pump failed"),
        Ok(Err(e)) => tracing::warn!(error = %e, "output pump panicked"),
        Err(_) => {
            tracing::warn!(pid, "output still open after exit, killing leftover processes");
            if let Some(pid) = pid {
                kill_group(pid);
            }
            task.abort();
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::executor::types::StageStatus;

/// A fully resolved process invocation.
///
/// Everything the child needs is carried here explicitly, including the
/// working directory and environment, so the executor never reads ambient
/// process state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl ResolvedCommand {
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: workdir.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-like one-line rendering for logs and reports.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Per-attempt limits handed to the process runner.
#[derive(Debug, Clone)]
pub struct LaunchLimits {
    pub timeout: Option<Duration>,
    pub capture_bytes: usize,
    /// Grace period between SIGTERM and SIGKILL when terminating.
    pub kill_grace: Duration,
    /// Mirror child output to our own stdout/stderr while capturing.
    pub passthrough: bool,
}

impl Default for LaunchLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            capture_bytes: 64 * 1024,
            kill_grace: Duration::ZERO,
            passthrough: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Process terminated normally with this code.
    Exited(i32),
    /// Process was killed by a signal we did not send.
    Signaled,
    TimedOut,
    Cancelled,
    /// The OS refused to start the process (missing binary, bad workdir, ...).
    SpawnFailed(String),
}

/// What one attempt produced.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub kind: ExitKind,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

impl ProcessOutcome {
    pub fn new(kind: ExitKind, duration_ms: u64) -> Self {
        Self {
            kind,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms,
        }
    }

    pub fn exited(code: i32) -> Self {
        Self::new(ExitKind::Exited(code), 0)
    }

    pub fn cancelled(duration_ms: u64) -> Self {
        Self::new(ExitKind::Cancelled, duration_ms)
    }

    pub fn spawn_failed(message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        let mut outcome = Self::new(ExitKind::SpawnFailed(message.clone()), duration_ms);
        outcome.stderr = message;
        outcome
    }

    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            ExitKind::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Status this attempt would give the stage; zero is the only success.
    pub fn status(&self) -> StageStatus {
        match self.kind {
            ExitKind::Exited(0) => StageStatus::Succeeded,
            ExitKind::Exited(_) | ExitKind::Signaled | ExitKind::SpawnFailed(_) => {
                StageStatus::Failed
            }
            ExitKind::TimedOut => StageStatus::TimedOut,
            ExitKind::Cancelled => StageStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_to_statuses() {
        assert_eq!(ProcessOutcome::exited(0).status(), StageStatus::Succeeded);
        assert_eq!(ProcessOutcome::exited(1).status(), StageStatus::Failed);
        assert_eq!(ProcessOutcome::exited(-7).status(), StageStatus::Failed);
        assert_eq!(
            ProcessOutcome::new(ExitKind::TimedOut, 10).status(),
            StageStatus::TimedOut
        );
        assert_eq!(ProcessOutcome::cancelled(0).status(), StageStatus::Cancelled);
        assert_eq!(
            ProcessOutcome::spawn_failed("no such file", 0).status(),
            StageStatus::Failed
        );
    }

    #[test]
    fn only_normal_exit_has_a_code() {
        assert_eq!(ProcessOutcome::exited(3).exit_code(), Some(3));
        assert_eq!(ProcessOutcome::new(ExitKind::Signaled, 0).exit_code(), None);
        assert_eq!(ProcessOutcome::new(ExitKind::TimedOut, 0).exit_code(), None);
    }

    #[test]
    fn display_quotes_args_with_spaces() {
        let cmd = ResolvedCommand::new("sh", "/tmp").args(["-c", "exit 1"]);
        assert_eq!(cmd.display(), "sh -c 'exit 1'");
    }
}

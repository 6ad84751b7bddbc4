use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::runner::ProcessOutcome;

/// Exit code reported when the run was interrupted.
pub const EXIT_CODE_CANCELLED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Skipped,
    Cancelled,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Statuses that are eligible for retry and propagate skips downstream.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }

    fn can_transition_to(self, next: StageStatus) -> bool {
        use StageStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Skipped)
                | (Pending, Cancelled)
                | (Running, Pending)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome record for one stage. Terminal statuses never change again.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage_id: String,
    pub status: StageStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Attempts made so far; 0 means the command was never started.
    pub attempt: u32,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub skip_reason: Option<String>,
}

impl StageResult {
    pub fn pending(stage_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            status: StageStatus::Pending,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            attempt: 0,
            started_at: None,
            finished_at: None,
            skip_reason: None,
        }
    }

    fn transition(&mut self, next: StageStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                stage = %self.stage_id,
                from = %self.status,
                to = %next,
                "illegal stage transition ignored"
            );
            false
        }
    }

    /// Pending → Running for a new attempt.
    pub fn begin_attempt(&mut self) -> bool {
        if !self.transition(StageStatus::Running) {
            return false;
        }
        self.attempt += 1;
        if self.started_at.is_none() {
            self.started_at = Some(Local::now());
        }
        true
    }

    /// Record the outcome of the running attempt.
    ///
    /// A failure with `retry_allowed` goes back to Pending; anything else is
    /// terminal. Captured output always reflects the latest attempt.
    pub fn finish_attempt(&mut self, outcome: ProcessOutcome, retry_allowed: bool) -> StageStatus {
        let status = outcome.status();
        let next = if status.is_failure() && retry_allowed {
            StageStatus::Pending
        } else {
            status
        };
        if !self.transition(next) {
            return self.status;
        }

        self.exit_code = outcome.exit_code();
        self.stdout = outcome.stdout;
        self.stderr = outcome.stderr;
        self.stdout_truncated = outcome.stdout_truncated;
        self.stderr_truncated = outcome.stderr_truncated;
        if next.is_terminal() {
            self.finished_at = Some(Local::now());
        }
        next
    }

    /// Pending → Skipped without running.
    pub fn skip(&mut self, reason: impl Into<String>) -> bool {
        if !self.transition(StageStatus::Skipped) {
            return false;
        }
        self.skip_reason = Some(reason.into());
        self.finished_at = Some(Local::now());
        true
    }

    /// Pending → Cancelled for a stage interrupted while waiting to retry.
    /// Stages that never ran are skipped instead.
    pub fn cancel_waiting(&mut self) -> bool {
        if self.attempt == 0 || !self.transition(StageStatus::Cancelled) {
            return false;
        }
        self.finished_at = Some(Local::now());
        true
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    pub fn was_executed(&self) -> bool {
        self.attempt > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Mutable state of a run in progress, owned by the execution engine.
#[derive(Debug)]
pub struct Run {
    run_id: String,
    waves: Vec<Vec<String>>,
    results: HashMap<String, StageResult>,
    started_at: DateTime<Local>,
    cancelled: bool,
}

impl Run {
    /// Admit every planned stage as Pending.
    pub fn new(run_id: impl Into<String>, waves: Vec<Vec<String>>) -> Self {
        let results = waves
            .iter()
            .flatten()
            .map(|id| (id.clone(), StageResult::pending(id.clone())))
            .collect();
        Self {
            run_id: run_id.into(),
            waves,
            results,
            started_at: Local::now(),
            cancelled: false,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn result(&self, stage_id: &str) -> Option<&StageResult> {
        self.results.get(stage_id)
    }

    pub fn result_mut(&mut self, stage_id: &str) -> Option<&mut StageResult> {
        self.results.get_mut(stage_id)
    }

    pub fn status_of(&self, stage_id: &str) -> Option<StageStatus> {
        self.results.get(stage_id).map(|r| r.status)
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Skip every stage that is still Pending. Returns the ids skipped, in
    /// plan order.
    pub fn skip_remaining(&mut self, reason: &str) -> Vec<String> {
        let mut skipped = Vec::new();
        for id in self.waves.iter().flatten() {
            if let Some(result) = self.results.get_mut(id) {
                if result.status == StageStatus::Pending && result.skip(reason) {
                    skipped.push(id.clone());
                }
            }
        }
        skipped
    }

    /// Freeze the run. Results come out in plan order (wave, then
    /// declaration) regardless of completion timing.
    pub fn finalize(mut self) -> RunResult {
        self.skip_remaining("not scheduled");

        let mut stages = Vec::with_capacity(self.results.len());
        for id in self.waves.iter().flatten() {
            if let Some(result) = self.results.remove(id) {
                stages.push(result);
            }
        }

        let all_ok = stages
            .iter()
            .filter(|r| r.status != StageStatus::Skipped)
            .all(|r| r.status == StageStatus::Succeeded);
        let status = if all_ok && !self.cancelled {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };

        RunResult {
            run_id: self.run_id,
            waves: self.waves,
            stages,
            status,
            cancelled: self.cancelled,
            started_at: self.started_at,
            finished_at: Local::now(),
        }
    }
}

/// A finalized, read-only run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: String,
    pub waves: Vec<Vec<String>>,
    pub stages: Vec<StageResult>,
    pub status: RunStatus,
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunResult {
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => 0,
            RunStatus::Failed if self.cancelled => EXIT_CODE_CANCELLED,
            RunStatus::Failed => 1,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn get(&self, stage_id: &str) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage_id == stage_id)
    }

    pub fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|r| r.status == status).count()
    }
}

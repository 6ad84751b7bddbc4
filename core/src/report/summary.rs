use serde::Serialize;

use crate::executor::types::{RunResult, RunStatus, StageStatus};

/// Machine-checkable outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub exit_code: i32,
    pub cancelled: bool,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub cancelled_stages: usize,
    pub duration_ms: u64,
}

pub fn build_summary(run: &RunResult) -> RunSummary {
    RunSummary {
        run_id: run.run_id.clone(),
        status: run.status,
        exit_code: run.exit_code(),
        cancelled: run.cancelled,
        total: run.stages.len(),
        succeeded: run.count(StageStatus::Succeeded),
        failed: run.count(StageStatus::Failed),
        timed_out: run.count(StageStatus::TimedOut),
        skipped: run.count(StageStatus::Skipped),
        cancelled_stages: run.count(StageStatus::Cancelled),
        duration_ms: run.duration_ms(),
    }
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

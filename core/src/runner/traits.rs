use async_trait::async_trait;

use crate::executor::CancelToken;

use super::types::{LaunchLimits, ProcessOutcome, ResolvedCommand};

/// Runs one attempt of one stage.
///
/// Implementations spawn exactly one process per call and must return once
/// the process has exited, the timeout expired or `cancel` fired. Failures
/// to spawn are reported through the outcome, never as a panic.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        command: &ResolvedCommand,
        limits: &LaunchLimits,
        cancel: &CancelToken,
    ) -> ProcessOutcome;
}

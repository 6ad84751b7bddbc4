//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `maestro_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_for_package, AppConfig, ExecutorConfig, Linter, LoggingConfig, RetryConfig,
    RetryStrategyKind, StageSpec, ToolKind, ToolchainConfig,
};
pub use crate::error::{CliError, ExecutorError, RunnerError};
pub use crate::executor::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin};
pub use crate::executor::types::{
    ExecutionOpts, Run, RunResult, RunStatus, Stage, StageResult, StageStatus,
};
pub use crate::executor::{CancelToken, ExecutionEngine, StageGraph};
pub use crate::report::{build_report, format_json, format_text, RunSummary};
pub use crate::runner::{
    ExitKind, LaunchLimits, ProcessOutcome, ProcessRunner, ResolvedCommand, TokioProcessRunner,
};

//! Stage graph execution.
//!
//! ```text
//! Vec<Stage>
//!   ↓
//! StageGraph::from_stages()  → duplicate ids rejected
//!   ↓
//! StageGraph::validate()     → unknown dependencies, cycles
//!   ↓
//! StageGraph::waves()        → Vec<Vec<String>> (execution waves)
//!   ↓
//! ExecutionEngine::execute() → RunResult
//! ```
//!
//! Within a wave stages run concurrently up to `max_parallel`; the engine
//! does not start a wave until the previous one is fully terminal.

mod cancel;
mod engine;
mod graph;
mod output;
mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use cancel::CancelToken;
pub use engine::{ExecutionEngine, ExecutionEngineBuilder};
pub use graph::StageGraph;
pub use output::trace_event;
pub use progress::ProgressMonitor;
pub use types::{ExecutionOpts, Run, RunResult, RunStatus, Stage, StageResult, StageStatus};

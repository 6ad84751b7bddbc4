//! Process executor: runs one resolved stage command as a child process,
//! captures its output and enforces timeout and cancellation.

mod abort;
mod io_pump;
mod process;
mod traits;
pub mod types;

pub use abort::{kill_group, terminate_tree};
pub use process::TokioProcessRunner;
pub use traits::ProcessRunner;
pub use types::{ExitKind, LaunchLimits, ProcessOutcome, ResolvedCommand};

use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::runner::LaunchLimits;

/// Options for one run of the execution engine.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Maximum stages running at once within a wave.
    pub max_parallel: usize,

    /// Bytes kept from each of stdout/stderr per attempt.
    pub capture_bytes: usize,

    /// SIGTERM → SIGKILL grace when a stage is terminated.
    pub kill_grace: Duration,

    /// Mirror stage output to the terminal while capturing.
    pub stream_output: bool,

    /// Show indicatif spinners (text mode on a terminal only).
    pub progress_bar: bool,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            max_parallel: num_cpus::get().max(1),
            capture_bytes: 64 * 1024,
            kill_grace: Duration::ZERO,
            stream_output: false,
            progress_bar: false,
        }
    }
}

impl ExecutionOpts {
    pub fn from_config(cfg: &ExecutorConfig) -> Self {
        Self {
            max_parallel: cfg.effective_max_parallel(),
            capture_bytes: cfg.capture_bytes,
            kill_grace: Duration::from_millis(cfg.kill_grace_ms),
            stream_output: cfg.stream_output,
            progress_bar: false,
        }
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub(crate) fn launch_limits(&self, timeout: Option<Duration>) -> LaunchLimits {
        LaunchLimits {
            timeout,
            capture_bytes: self.capture_bytes,
            kill_grace: self.kill_grace,
            passthrough: self.stream_output,
        }
    }
}

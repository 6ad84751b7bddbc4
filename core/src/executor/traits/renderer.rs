use crate::executor::types::{RunResult, StageResult, StageStatus};

/// Live output renderer (controls the event stream format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn supports_streaming(&self) -> bool {
        false
    }
    fn render(&self, event: &RenderEvent);
}

/// Events emitted by the execution engine, in emission order.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_stages: usize,
        total_waves: usize,
    },
    Plan {
        run_id: String,
        waves: Vec<Vec<String>>,
    },
    WaveStart {
        run_id: String,
        wave: usize,
        stage_ids: Vec<String>,
    },
    StageStart {
        run_id: String,
        stage_id: String,
        wave: usize,
        attempt: u32,
        command: String,
    },
    /// An attempt failed and another one will be dispatched after `delay_ms`.
    StageRetry {
        run_id: String,
        stage_id: String,
        attempt: u32,
        status: StageStatus,
        delay_ms: u64,
    },
    /// The stage reached a terminal status, including Skipped.
    StageComplete {
        run_id: String,
        wave: usize,
        result: StageResult,
    },
    WaveEnd {
        run_id: String,
        wave: usize,
    },
    RunEnd {
        run_id: String,
        result: RunResult,
    },
}

impl RenderEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::Plan { run_id, .. }
            | Self::WaveStart { run_id, .. }
            | Self::StageStart { run_id, .. }
            | Self::StageRetry { run_id, .. }
            | Self::StageComplete { run_id, .. }
            | Self::WaveEnd { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }

    /// Dotted event name used by structured renderers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::Plan { .. } => "run.plan",
            Self::WaveStart { .. } => "wave.start",
            Self::StageStart { .. } => "stage.start",
            Self::StageRetry { .. } => "stage.retry",
            Self::StageComplete { .. } => "stage.end",
            Self::WaveEnd { .. } => "wave.end",
            Self::RunEnd { .. } => "run.end",
        }
    }
}

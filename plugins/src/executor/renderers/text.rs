use maestro_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use maestro_core::executor::types::{StageResult, StageStatus};
use maestro_core::report::format_duration;

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn mark(&self, status: StageStatus) -> &'static str {
        match (status, self.ascii_only) {
            (StageStatus::Succeeded, true) => "OK",
            (StageStatus::Succeeded, false) => "✔",
            (StageStatus::Skipped, _) => "-",
            (StageStatus::Cancelled, true) => "CANCEL",
            (StageStatus::Cancelled, false) => "⊘",
            (_, true) => "FAIL",
            (_, false) => "✘",
        }
    }

    fn stage_end(&self, run_id: &str, wave: usize, result: &StageResult) -> String {
        let mut line = format!(
            "STAGE END {} {} (stage {}, wave {}, status {}",
            run_id,
            self.mark(result.status),
            result.stage_id,
            wave,
            result.status
        );
        if let Some(code) = result.exit_code {
            line.push_str(&format!(", exit {code}"));
        }
        if result.was_executed() {
            line.push_str(&format!(
                ", attempts {}, duration {}",
                result.attempt,
                format_duration(result.duration_ms())
            ));
        }
        if let Some(reason) = &result.skip_reason {
            line.push_str(&format!(", {reason}"));
        }
        line.push(')');
        line
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_stages,
                total_waves,
            } => format!(
                "RUN START {} (stages: {}, waves: {})",
                run_id, total_stages, total_waves
            ),
            RenderEvent::Plan { run_id, waves } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, wave) in waves.iter().enumerate() {
                    out.push_str(&format!("\n  wave {}: {}", idx, wave.join(", ")));
                }
                out
            }
            RenderEvent::WaveStart {
                run_id,
                wave,
                stage_ids,
            } => format!(
                "WAVE START {} (wave {}, stages: {})",
                run_id,
                wave,
                stage_ids.join(", ")
            ),
            RenderEvent::StageStart {
                run_id,
                stage_id,
                wave,
                attempt,
                command,
            } => format!(
                "STAGE START {} (stage {}, wave {}, attempt {}): {}",
                run_id, stage_id, wave, attempt, command
            ),
            RenderEvent::StageRetry {
                run_id,
                stage_id,
                attempt,
                status,
                delay_ms,
            } => format!(
                "STAGE RETRY {} (stage {}, attempt {} {}, next in {})",
                run_id,
                stage_id,
                attempt,
                status,
                format_duration(*delay_ms)
            ),
            RenderEvent::StageComplete {
                run_id,
                wave,
                result,
            } => self.stage_end(run_id, *wave, result),
            RenderEvent::WaveEnd { run_id, wave } => {
                format!("WAVE END {} (wave {})", run_id, wave)
            }
            RenderEvent::RunEnd { run_id, result } => format!(
                "RUN END {} (status {}, succeeded {}, failed {}, timed out {}, skipped {}, cancelled {}, duration {})",
                run_id,
                if result.cancelled {
                    "cancelled"
                } else {
                    result.status.as_str()
                },
                result.count(StageStatus::Succeeded),
                result.count(StageStatus::Failed),
                result.count(StageStatus::TimedOut),
                result.count(StageStatus::Skipped),
                result.count(StageStatus::Cancelled),
                format_duration(result.duration_ms())
            ),
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}

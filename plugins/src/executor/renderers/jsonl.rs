use chrono::Local;
use maestro_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use maestro_core::report::build_summary;
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let mut value = json!({
            "v": 1,
            "event_type": event.event_type(),
            "ts": ts,
            "run_id": event.run_id(),
        });
        match event {
            RenderEvent::RunStart {
                total_stages,
                total_waves,
                ..
            } => {
                value["metadata"] = json!({
                    "total_stages": total_stages,
                    "total_waves": total_waves,
                });
            }
            RenderEvent::Plan { waves, .. } => {
                let total_stages: usize = waves.iter().map(|w| w.len()).sum();
                value["metadata"] = json!({
                    "waves": waves,
                    "total_stages": total_stages,
                });
            }
            RenderEvent::WaveStart {
                wave, stage_ids, ..
            } => {
                value["metadata"] = json!({
                    "wave": wave,
                    "stages": stage_ids,
                });
            }
            RenderEvent::StageStart {
                stage_id,
                wave,
                attempt,
                command,
                ..
            } => {
                value["stage_id"] = json!(stage_id);
                value["metadata"] = json!({
                    "wave": wave,
                    "attempt": attempt,
                    "command": command,
                });
            }
            RenderEvent::StageRetry {
                stage_id,
                attempt,
                status,
                delay_ms,
                ..
            } => {
                value["stage_id"] = json!(stage_id);
                value["metadata"] = json!({
                    "attempt": attempt,
                    "status": status,
                    "delay_ms": delay_ms,
                });
            }
            RenderEvent::StageComplete { wave, result, .. } => {
                value["stage_id"] = json!(result.stage_id);
                value["code"] = json!(result.exit_code);
                value["metadata"] = json!({
                    "wave": wave,
                    "status": result.status,
                    "attempts": result.attempt,
                    "duration_ms": result.duration_ms(),
                    "skip_reason": result.skip_reason,
                    "stdout_truncated": result.stdout_truncated,
                    "stderr_truncated": result.stderr_truncated,
                });
            }
            RenderEvent::WaveEnd { wave, .. } => {
                value["metadata"] = json!({ "wave": wave });
            }
            RenderEvent::RunEnd { result, .. } => {
                let summary = build_summary(result);
                value["code"] = json!(summary.exit_code);
                value["metadata"] = serde_json::to_value(&summary).unwrap_or(Value::Null);
            }
        }
        value
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}

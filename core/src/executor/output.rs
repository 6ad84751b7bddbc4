use super::traits::RenderEvent;

/// Emit an engine event as a tracing record. Used when no renderer is
/// installed so runs stay observable through the log layer. Stage outcomes
/// are `info`; the final report already carries failures.
pub fn trace_event(event: &RenderEvent) {
    match event {
        RenderEvent::RunStart {
            run_id,
            total_stages,
            total_waves,
        } => tracing::info!(%run_id, total_stages, total_waves, "run started"),
        RenderEvent::Plan { run_id, waves } => {
            for (i, wave) in waves.iter().enumerate() {
                tracing::debug!(%run_id, wave = i, stages = %wave.join(", "), "planned wave");
            }
        }
        RenderEvent::WaveStart {
            run_id,
            wave,
            stage_ids,
        } => tracing::debug!(%run_id, wave, stages = stage_ids.len(), "wave started"),
        RenderEvent::StageStart {
            run_id,
            stage_id,
            attempt,
            command,
            ..
        } => tracing::info!(%run_id, stage = %stage_id, attempt, %command, "stage started"),
        RenderEvent::StageRetry {
            run_id,
            stage_id,
            attempt,
            status,
            delay_ms,
        } => tracing::info!(
            %run_id,
            stage = %stage_id,
            attempt,
            %status,
            delay_ms,
            "stage attempt failed, retrying"
        ),
        RenderEvent::StageComplete { run_id, result, .. } => tracing::info!(
            %run_id,
            stage = %result.stage_id,
            status = %result.status,
            exit_code = ?result.exit_code,
            attempts = result.attempt,
            reason = result.skip_reason.as_deref().unwrap_or(""),
            duration_ms = result.duration_ms(),
            "stage finished"
        ),
        RenderEvent::WaveEnd { run_id, wave } => tracing::debug!(%run_id, wave, "wave finished"),
        RenderEvent::RunEnd { run_id, result } => tracing::info!(
            %run_id,
            status = result.status.as_str(),
            cancelled = result.cancelled,
            duration_ms = result.duration_ms(),
            "run finished"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::StageResult;
    use crate::runner::ProcessOutcome;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_at(level: tracing::Level, event: &RenderEvent) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || trace_event(event));
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn failed_stage() -> RenderEvent {
        let mut result = StageResult::pending("lint");
        assert!(result.begin_attempt());
        result.finish_attempt(ProcessOutcome::exited(1), false);
        RenderEvent::StageComplete {
            run_id: "run-1".into(),
            wave: 0,
            result,
        }
    }

    #[test]
    fn failed_stage_is_not_a_warning() {
        assert_eq!(logged_at(tracing::Level::WARN, &failed_stage()), "");
    }

    #[test]
    fn failed_stage_is_logged_at_info() {
        let out = logged_at(tracing::Level::INFO, &failed_stage());
        assert!(out.contains("stage finished"), "{out}");
        assert!(out.contains("status=failed"), "{out}");
    }
}

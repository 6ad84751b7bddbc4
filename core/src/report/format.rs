use std::fmt::Write as _;

use serde_json::Value;

use crate::executor::types::{RunResult, RunStatus, StageResult, StageStatus};

use super::summary::build_summary;

/// Full machine-readable report: summary, plan and per-stage detail in plan
/// order.
pub fn build_report(run: &RunResult) -> Value {
    let stages: Vec<Value> = run
        .stages
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.stage_id,
                "wave": wave_of(run, &r.stage_id),
                "status": r.status,
                "exit_code": r.exit_code,
                "attempts": r.attempt,
                "duration_ms": r.duration_ms(),
                "skip_reason": r.skip_reason,
                "started_at": r.started_at.map(|t| t.to_rfc3339()),
                "finished_at": r.finished_at.map(|t| t.to_rfc3339()),
                "stdout": r.stdout,
                "stderr": r.stderr,
                "stdout_truncated": r.stdout_truncated,
                "stderr_truncated": r.stderr_truncated,
            })
        })
        .collect();

    serde_json::json!({
        "summary": build_summary(run),
        "waves": run.waves,
        "stages": stages,
    })
}

pub fn format_json(run: &RunResult) -> String {
    serde_json::to_string_pretty(&build_report(run)).unwrap_or_else(|_| "{}".to_string())
}

/// Human report. Captured output is shown only for stages that ran and did
/// not succeed.
pub fn format_text(run: &RunResult) -> String {
    let width = run
        .stages
        .iter()
        .map(|r| r.stage_id.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();

    let _ = writeln!(out, "Run {}", run.run_id);
    for (wave, ids) in run.waves.iter().enumerate() {
        let _ = writeln!(out, "wave {wave}:");
        for id in ids {
            let Some(result) = run.get(id) else {
                continue;
            };
            write_stage(&mut out, result, width);
        }
    }

    let summary = build_summary(run);
    let verdict = match (summary.status, summary.cancelled) {
        (RunStatus::Succeeded, _) => "SUCCEEDED",
        (RunStatus::Failed, true) => "CANCELLED",
        (RunStatus::Failed, false) => "FAILED",
    };
    let _ = writeln!(
        out,
        "\n{verdict}: {} succeeded, {} failed, {} timed out, {} skipped, {} cancelled in {} (exit code {})",
        summary.succeeded,
        summary.failed,
        summary.timed_out,
        summary.skipped,
        summary.cancelled_stages,
        format_duration(summary.duration_ms),
        summary.exit_code,
    );
    out
}

fn write_stage(out: &mut String, result: &StageResult, width: usize) {
    let (mark, label) = match result.status {
        StageStatus::Succeeded => ("✔", "ok".to_string()),
        StageStatus::Failed => (
            "✘",
            match result.exit_code {
                Some(code) => format!("FAILED (exit {code})"),
                None => "FAILED".to_string(),
            },
        ),
        StageStatus::TimedOut => ("✘", "TIMED OUT".to_string()),
        StageStatus::Cancelled => ("✘", "CANCELLED".to_string()),
        StageStatus::Skipped => (
            "-",
            match result.skip_reason.as_deref() {
                Some(reason) => format!("skipped ({reason})"),
                None => "skipped".to_string(),
            },
        ),
        StageStatus::Pending | StageStatus::Running => ("?", result.status.to_string()),
    };

    let _ = write!(out, "  {mark} {:<width$}  {label}", result.stage_id);
    if result.was_executed() {
        let plural = if result.attempt == 1 { "" } else { "s" };
        let _ = write!(
            out,
            "  [{} attempt{plural}, {}]",
            result.attempt,
            format_duration(result.duration_ms())
        );
    }
    out.push('\n');

    if result.was_executed() && result.status != StageStatus::Succeeded {
        write_output(out, result);
    }
}

fn write_output(out: &mut String, result: &StageResult) {
    let streams = [
        ("stdout", &result.stdout, result.stdout_truncated),
        ("stderr", &result.stderr, result.stderr_truncated),
    ];
    let mut any = false;
    for (name, text, truncated) in streams {
        if text.trim().is_empty() {
            continue;
        }
        any = true;
        let note = if truncated { " (truncated, last bytes kept)" } else { "" };
        let _ = writeln!(out, "      {name}{note}:");
        for line in text.trim_end().lines() {
            let _ = writeln!(out, "      | {line}");
        }
    }
    if !any {
        let _ = writeln!(out, "      (no output)");
    }
}

pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1_000.0)
    }
}

fn wave_of(run: &RunResult, stage_id: &str) -> Option<usize> {
    run.waves
        .iter()
        .position(|wave| wave.iter().any(|id| id == stage_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(ms: i64) -> chrono::DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn executed(id: &str, status: StageStatus, exit_code: Option<i32>, ms: i64) -> StageResult {
        let mut r = StageResult::pending(id);
        r.status = status;
        r.exit_code = exit_code;
        r.attempt = 1;
        r.started_at = Some(at(0));
        r.finished_at = Some(at(ms));
        r
    }

    fn skipped(id: &str, reason: &str) -> StageResult {
        let mut r = StageResult::pending(id);
        r.status = StageStatus::Skipped;
        r.skip_reason = Some(reason.to_string());
        r
    }

    fn failed_run() -> RunResult {
        let mut lint = executed("lint", StageStatus::Failed, Some(1), 80);
        lint.stdout = "src/app.py:3:1: F401 unused import\n".to_string();
        lint.stderr = "x".repeat(4);
        lint.stderr_truncated = true;
        let mut format = executed("format", StageStatus::Succeeded, Some(0), 1_500);
        format.stdout = "All done!".to_string();
        let mut typecheck = executed("typecheck", StageStatus::Succeeded, Some(0), 250);
        typecheck.attempt = 2;

        RunResult {
            run_id: "run-1".to_string(),
            waves: vec![
                vec!["format".into(), "lint".into(), "typecheck".into()],
                vec!["test".into()],
            ],
            stages: vec![
                format,
                lint,
                typecheck,
                skipped("test", "dependency failed: lint"),
            ],
            status: RunStatus::Failed,
            cancelled: false,
            started_at: at(0),
            finished_at: at(2_000),
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let summary = build_summary(&failed_run());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.timed_out, 0);
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.duration_ms, 2_000);
        assert!(!summary.is_success());
    }

    #[test]
    fn text_report_lists_stages_in_plan_order() {
        let expected = "\
Run run-1
wave 0:
  ✔ format     ok  [1 attempt, 1.5s]
  ✘ lint       FAILED (exit 1)  [1 attempt, 80ms]
      stdout:
      | src/app.py:3:1: F401 unused import
      stderr (truncated, last bytes kept):
      | xxxx
  ✔ typecheck  ok  [2 attempts, 250ms]
wave 1:
  - test       skipped (dependency failed: lint)

FAILED: 2 succeeded, 1 failed, 0 timed out, 1 skipped, 0 cancelled in 2.0s (exit code 1)
";
        assert_eq!(format_text(&failed_run()), expected);
    }

    #[test]
    fn timed_out_stage_without_output_says_so() {
        let run = RunResult {
            run_id: "run-2".to_string(),
            waves: vec![vec!["slow".into()]],
            stages: vec![executed("slow", StageStatus::TimedOut, None, 1_000)],
            status: RunStatus::Failed,
            cancelled: false,
            started_at: at(0),
            finished_at: at(1_000),
        };
        let text = format_text(&run);
        assert!(text.contains("  ✘ slow  TIMED OUT  [1 attempt, 1.0s]\n      (no output)\n"));
        assert!(text.contains("FAILED: 0 succeeded, 0 failed, 1 timed out"));
    }

    #[test]
    fn cancelled_run_is_labelled() {
        let mut run = failed_run();
        run.cancelled = true;
        assert!(format_text(&run).contains("CANCELLED: "));
        assert!(format_text(&run).ends_with("(exit code 130)\n"));
    }

    #[test]
    fn json_report_carries_summary_and_stages() {
        let report = build_report(&failed_run());
        assert_eq!(report["summary"]["status"], "failed");
        assert_eq!(report["summary"]["failed"], 1);
        assert_eq!(report["stages"][1]["id"], "lint");
        assert_eq!(report["stages"][1]["exit_code"], 1);
        assert_eq!(report["stages"][1]["stderr_truncated"], true);
        assert_eq!(report["stages"][3]["status"], "skipped");
        assert_eq!(report["stages"][3]["wave"], 1);
        assert_eq!(report["stages"][3]["skip_reason"], "dependency failed: lint");

        let parsed: Value = serde_json::from_str(&format_json(&failed_run())).unwrap();
        assert_eq!(parsed["waves"][1][0], "test");
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(0), "0ms");
        assert_eq!(format_duration(999), "999ms");
        assert_eq!(format_duration(12_340), "12.3s");
    }
}

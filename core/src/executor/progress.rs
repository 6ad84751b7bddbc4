use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::StageStatus;

/// Terminal progress for a run: one overall bar plus a spinner per running
/// stage. A disabled monitor is a no-op, which is what non-TTY and JSONL
/// runs use.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    stage_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_stages: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                stage_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_stages as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stages {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("starting");

        Self {
            multi,
            overall,
            stage_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn start_stage(&mut self, stage_id: &str, attempt: u32) {
        if !self.enabled {
            return;
        }

        let label = attempt_label(stage_id, attempt);
        if let Some(bar) = self.stage_bars.get(stage_id) {
            bar.set_message(label);
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(label);
        bar.enable_steady_tick(Duration::from_millis(100));
        self.stage_bars.insert(stage_id.to_string(), bar);
    }

    /// Count a stage as done. Skipped stages never had a spinner.
    pub fn finish_stage(&mut self, stage_id: &str, status: StageStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.stage_bars.remove(stage_id) {
            let icon = if status == StageStatus::Succeeded { "✅" } else { "❌" };
            bar.finish_with_message(format!("{icon} {stage_id} {status} ({duration_ms}ms)"));
        }
        self.overall.inc(1);
    }

    pub fn set_wave(&self, wave: usize, total_waves: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("wave {}/{}", wave + 1, total_waves));
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success { "✅ all stages passed" } else { "❌ run failed" };
        self.overall.finish_with_message(msg);
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.stage_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

fn attempt_label(stage_id: &str, attempt: u32) -> String {
    if attempt > 1 {
        format!("⏳ {stage_id} (attempt {attempt})")
    } else {
        format!("⏳ {stage_id}")
    }
}

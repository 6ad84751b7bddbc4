#![allow(dead_code)]

use std::path::Path;

use maestro_core::api::{ResolvedCommand, Stage};

pub fn sh(script: &str, workdir: &Path) -> ResolvedCommand {
    ResolvedCommand::new("sh", workdir).args(["-c", script])
}

pub fn sh_stage(id: &str, script: &str, workdir: &Path, deps: &[&str]) -> Stage {
    Stage::new(id, sh(script, workdir)).depends_on(deps.iter().copied())
}

/// True while `pid` exists and is not a zombie.
pub fn process_running(pid: i32) -> bool {
    let stat_path = format!("/proc/{pid}/stat");
    if Path::new("/proc/self/stat").exists() {
        return match std::fs::read_to_string(stat_path) {
            // Field 3 (state) follows the parenthesised command name.
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .map(|state| state != 'Z' && state != 'X')
                .unwrap_or(false),
            Err(_) => false,
        };
    }
    // SAFETY: signal 0 only checks for existence.
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Poll until `pid` is gone or `within` elapses.
pub async fn wait_gone(pid: i32, within: std::time::Duration) -> bool {
    let deadline = std::time::Instant::now() + within;
    while std::time::Instant::now() < deadline {
        if !process_running(pid) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    !process_running(pid)
}

//! `maestro plan`: show the waves a run would execute.
use std::fmt::Write as _;

use maestro_core::api as core_api;
use maestro_plugins::toolchain::StageOverrides;

use crate::app;
use crate::commands::cli::{Args, SelectArgs};

pub fn handle_plan(
    args: &Args,
    select: SelectArgs,
    cfg: core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    let prepared = app::prepare(&cfg, &args.package, &select, &StageOverrides::default())?;
    let graph = core_api::StageGraph::from_stages(&prepared.stages)?;
    let waves = graph.plan()?;
    print!("{}", format_plan(&graph, &waves));
    Ok(0)
}

/// One block per wave, one line per stage with its command.
pub fn format_plan(graph: &core_api::StageGraph<core_api::Stage>, waves: &[Vec<String>]) -> String {
    let width = graph.ids().iter().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (idx, wave) in waves.iter().enumerate() {
        let _ = writeln!(out, "wave {idx}:");
        for stage_id in wave {
            if let Some(stage) = graph.stage(stage_id) {
                let _ = writeln!(
                    out,
                    "  {:<width$}  {}",
                    stage_id,
                    stage.command.display(),
                    width = width
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_waves_with_commands() {
        let stages = vec![
            core_api::Stage::new("lint", core_api::ResolvedCommand::new("ruff", ".").arg("src")),
            core_api::Stage::new("test", core_api::ResolvedCommand::new("pytest", ".").arg("tests"))
                .depends_on(["lint"]),
        ];
        let graph = core_api::StageGraph::from_stages(&stages).unwrap();
        let waves = graph.plan().unwrap();
        assert_eq!(
            format_plan(&graph, &waves),
            "wave 0:\n  lint  ruff src\nwave 1:\n  test  pytest tests\n"
        );
    }
}

//! `maestro run`: execute the selected stages and print the report.
use maestro_core::api as core_api;
use maestro_core::executor::ExecutionEngine;
use maestro_plugins::factory::{build_renderer, build_retry_strategy};
use maestro_plugins::toolchain::StageOverrides;

use crate::app;
use crate::commands::cli::{Args, ReportFormat, RunArgs};

/// Returns the process exit code for the finished run.
pub async fn handle_run(
    args: &Args,
    run_args: RunArgs,
    mut cfg: core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    apply_run_flags(&mut cfg, &run_args)?;
    let overrides = StageOverrides {
        timeouts: run_args.timeouts.clone(),
        retries: run_args.retries.clone(),
        keep_going: run_args.keep_going,
    };
    let prepared = app::prepare(&cfg, &args.package, &run_args.select, &overrides)?;

    let stdout_tty = atty::is(atty::Stream::Stdout);
    let mut opts = core_api::ExecutionOpts::from_config(&cfg.executor);
    opts.progress_bar = run_args.format.is_none() && !cfg.executor.stream_output && stdout_tty;

    let mut builder =
        ExecutionEngine::builder(opts).retry_strategy(build_retry_strategy(&cfg.executor.retry));
    if let Some(format) = run_args.format {
        builder = builder.renderer(build_renderer(format.as_str(), !stdout_tty)?);
    }
    let engine = builder.build();

    let cancel = engine.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    tracing::info!(
        package = %prepared.layout.root.display(),
        stages = prepared.stages.len(),
        "starting run"
    );
    let result = engine.execute(&prepared.stages).await;
    interrupt.abort();
    let result = result?;

    match run_args.report {
        ReportFormat::Text => print!("{}", core_api::format_text(&result)),
        ReportFormat::Json => println!("{}", core_api::format_json(&result)),
    }
    Ok(result.exit_code())
}

fn apply_run_flags(
    cfg: &mut core_api::AppConfig,
    run_args: &RunArgs,
) -> Result<(), core_api::CliError> {
    if let Some(jobs) = run_args.jobs {
        if jobs == 0 {
            return Err(core_api::CliError::Config(
                "--jobs must be at least 1".to_string(),
            ));
        }
        cfg.executor.max_parallel = Some(jobs);
    }
    if run_args.fix {
        cfg.toolchain.fix = true;
    }
    if run_args.stream_output {
        cfg.executor.stream_output = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::Commands;
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Commands::Run(run) => run,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let mut cfg = core_api::AppConfig::default();
        apply_run_flags(
            &mut cfg,
            &run_args(&["maestro", "run", "-j", "3", "--fix", "--stream-output"]),
        )
        .unwrap();
        assert_eq!(cfg.executor.max_parallel, Some(3));
        assert!(cfg.toolchain.fix);
        assert!(cfg.executor.stream_output);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let mut cfg = core_api::AppConfig::default();
        let err = apply_run_flags(&mut cfg, &run_args(&["maestro", "run", "-j", "0"])).unwrap_err();
        assert!(matches!(err, core_api::CliError::Config(_)));
    }
}

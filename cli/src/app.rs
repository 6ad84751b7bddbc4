//! Wiring between the command line, configuration and the toolchain:
//! parses arguments, maps errors to exit codes, loads the package's
//! configuration and turns a selection into resolved stages.
use std::ffi::OsString;
use std::path::Path;

use clap::error::ErrorKind;
use clap::Parser;
use maestro_core::api as core_api;
use maestro_plugins::toolchain::{
    expand_package_dir, missing_programs, PackageLayout, StageOverrides, Toolchain,
};

use crate::commands::cli::{Args, SelectArgs};

/// Parse the command line. Help and version requests print and exit here;
/// every other rejection is a usage error (exit 11).
pub fn parse_args<I, T>(argv: I) -> Result<Args, core_api::CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
        _ => core_api::CliError::Usage(e.to_string().trim_end().to_string()),
    })
}

pub fn exit_code_for_error(e: &core_api::CliError) -> i32 {
    // 0: run succeeded
    // 1: run failed (returned as a normal exit code, not as an error)
    // 11: config or usage error
    // 20: spawn / IO error
    // 50: internal/uncategorized
    // 130: run cancelled (returned as a normal exit code)
    match e {
        core_api::CliError::Config(_)
        | core_api::CliError::Usage(_)
        | core_api::CliError::Executor(_) => 11,
        core_api::CliError::Io(_) | core_api::CliError::Command(_) => 20,
        core_api::CliError::Anyhow(_) => 50,
    }
}

pub fn load_config(
    package: &str,
    explicit: Option<&Path>,
) -> Result<core_api::AppConfig, core_api::CliError> {
    core_api::load_for_package(&expand_package_dir(package), explicit)
        .map_err(|e| core_api::CliError::Config(format!("{e:#}")))
}

/// Stages selected for one invocation, in declaration order.
#[derive(Debug)]
pub struct PreparedRun {
    pub layout: PackageLayout,
    pub stages: Vec<core_api::Stage>,
}

#[tracing::instrument(name = "cli.prepare", skip(cfg, select, overrides))]
pub fn prepare(
    cfg: &core_api::AppConfig,
    package: &str,
    select: &SelectArgs,
    overrides: &StageOverrides,
) -> Result<PreparedRun, core_api::CliError> {
    let layout = PackageLayout::inspect(package, &cfg.toolchain)?;
    let toolchain = Toolchain::new(cfg, layout);

    let mut specs = toolchain.stage_specs();
    overrides.apply(&mut specs)?;
    let selected = toolchain.select(&specs, &select.targets, select.only)?;
    let stages = toolchain.resolve(&selected)?;

    for program in missing_programs(&stages) {
        tracing::warn!(%program, "program not found on PATH; its stage will fail to start");
    }

    Ok(PreparedRun {
        layout: toolchain.layout().clone(),
        stages,
    })
}

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use maestro_core::config::{AppConfig, CommandSpec, StageSpec};
use maestro_core::error::ExecutorError;
use maestro_core::executor::types::Stage;
use maestro_core::executor::StageGraph;
use maestro_core::runner::ResolvedCommand;
use maestro_core::util::expand_placeholders;

use super::defaults::{default_stages, groups};
use super::layout::PackageLayout;
use super::tools::{requirements, tool_template};

/// Turns configured stage specs into runnable stages for one package.
pub struct Toolchain<'a> {
    config: &'a AppConfig,
    layout: PackageLayout,
}

impl<'a> Toolchain<'a> {
    pub fn new(config: &'a AppConfig, layout: PackageLayout) -> Self {
        Self { config, layout }
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    fn uses_builtin_stages(&self) -> bool {
        self.config.stages.is_empty()
    }

    /// Configured stages, or the built-in graph when none are configured.
    pub fn stage_specs(&self) -> Vec<StageSpec> {
        if self.uses_builtin_stages() {
            default_stages(&self.config.toolchain)
        } else {
            self.config.stages.clone()
        }
    }

    pub fn groups(&self, specs: &[StageSpec]) -> BTreeMap<String, Vec<String>> {
        groups(specs, self.uses_builtin_stages(), &self.config.groups)
    }

    /// Validate the full stage set and narrow it to `targets`.
    ///
    /// Targets are group names or stage ids. Without `only`, transitive
    /// dependencies are pulled in; with it, dependencies outside the
    /// selection are dropped. No targets selects everything.
    pub fn select(
        &self,
        specs: &[StageSpec],
        targets: &[String],
        only: bool,
    ) -> Result<Vec<StageSpec>, ExecutorError> {
        let graph = StageGraph::from_stages(specs)?;
        graph.validate()?;
        if targets.is_empty() {
            return Ok(specs.to_vec());
        }

        let groups = self.groups(specs);
        let mut roots: Vec<String> = Vec::new();
        for target in targets {
            let members = match groups.get(target) {
                Some(members) => members.clone(),
                None if graph.stage(target).is_some() => vec![target.clone()],
                None => return Err(ExecutorError::UnknownStage(target.clone())),
            };
            for member in members {
                if !roots.contains(&member) {
                    roots.push(member);
                }
            }
        }

        let selected = graph.select(&roots, !only)?;
        tracing::debug!(targets = ?targets, selected = ?selected.ids(), only, "selected stages");
        Ok(selected
            .ids()
            .iter()
            .filter_map(|id| selected.stage(id).cloned())
            .collect())
    }

    pub fn resolve(&self, specs: &[StageSpec]) -> Result<Vec<Stage>, ExecutorError> {
        specs.iter().map(|spec| self.resolve_stage(spec)).collect()
    }

    /// Expand placeholders and apply the default timeout. A configured timeout
    /// of 0 disables the timeout for that stage.
    pub fn resolve_stage(&self, spec: &StageSpec) -> Result<Stage, ExecutorError> {
        let template = match spec.command_spec()? {
            CommandSpec::Tool(tool) => {
                let needs = requirements(tool);
                if needs.src && !self.layout.has_src {
                    return Err(missing_dir(spec, "source", &self.layout.src_dir, self.layout.root()));
                }
                if needs.tests && !self.layout.has_tests {
                    return Err(missing_dir(spec, "tests", &self.layout.tests_dir, self.layout.root()));
                }
                tool_template(tool, &self.config.toolchain, &self.layout)
            }
            CommandSpec::Custom(argv) => argv.to_vec(),
        };

        let vars = self.layout.placeholders();
        let mut argv = template.iter().map(|arg| expand_placeholders(arg, &vars));
        let program = argv
            .next()
            .ok_or_else(|| ExecutorError::invalid(&spec.id, "command must name a program"))?;
        let mut command = ResolvedCommand::new(program, self.layout.root.clone()).args(argv);
        for (key, value) in &spec.env {
            command = command.env(key.clone(), expand_placeholders(value, &vars));
        }

        let mut stage = Stage::new(spec.id.clone(), command)
            .depends_on(spec.depends_on.iter().cloned())
            .max_retries(spec.max_retries)
            .continue_on_failure(spec.continue_on_failure);
        let timeout = match spec.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => self.config.executor.default_timeout(),
        };
        if let Some(timeout) = timeout {
            stage = stage.timeout(timeout);
        }
        Ok(stage)
    }
}

fn missing_dir(spec: &StageSpec, what: &str, dir: &str, root: &Path) -> ExecutorError {
    ExecutorError::invalid(
        &spec.id,
        format!("{what} directory '{dir}' not found in {}", root.display()),
    )
}

/// Programs of `stages` that cannot be found on PATH. Paths with a
/// separator are left to the executor.
pub fn missing_programs(stages: &[Stage]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for stage in stages {
        let program = &stage.command.program;
        if program.contains(std::path::MAIN_SEPARATOR) || missing.contains(program) {
            continue;
        }
        if which::which(program).is_err() {
            missing.push(program.clone());
        }
    }
    missing
}

//! Command templates for the built-in tools.
//!
//! Templates keep `{src}`-style placeholders; they are expanded together
//! with user-written commands when a stage is resolved.

use maestro_core::config::{CoverageReport, QtApi, ToolKind, ToolchainConfig};

use super::layout::PackageLayout;

/// Directories a tool cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requires {
    pub src: bool,
    pub tests: bool,
}

pub fn requirements(tool: ToolKind) -> Requires {
    match tool {
        ToolKind::Black | ToolKind::Isort | ToolKind::Ruff | ToolKind::Flake8 | ToolKind::Mypy => {
            Requires {
                src: true,
                tests: false,
            }
        }
        ToolKind::Pytest => Requires {
            src: false,
            tests: true,
        },
        ToolKind::Wheel => Requires {
            src: false,
            tests: false,
        },
    }
}

/// Argv template for `tool`. The tests directory is only passed to
/// source checkers when it exists.
pub fn tool_template(tool: ToolKind, cfg: &ToolchainConfig, layout: &PackageLayout) -> Vec<String> {
    let mut argv: Vec<String> = match tool {
        ToolKind::Black => {
            let mut argv = to_owned(&["black", "-l", "{line_length}"]);
            if !cfg.fix {
                argv.push("--check".into());
            }
            argv
        }
        ToolKind::Isort => {
            let mut argv = to_owned(&["isort", "--settings-file", "pyproject.toml"]);
            if !cfg.fix {
                argv.push("--check".into());
            }
            argv
        }
        ToolKind::Ruff => {
            let mut argv = to_owned(&["ruff", "check", "--config", "pyproject.toml"]);
            if cfg.fix {
                argv.push("--fix".into());
            }
            argv
        }
        ToolKind::Flake8 => to_owned(&["flake8"]),
        ToolKind::Mypy => {
            let mut argv = to_owned(&[
                "mypy",
                "--config-file",
                "pyproject.toml",
                "--pretty",
                "--warn-unused-configs",
            ]);
            if cfg.mypy_strict {
                argv.push("--strict".into());
            }
            argv.extend(qt_flags(cfg.qt_api));
            argv
        }
        ToolKind::Pytest => return pytest_template(cfg),
        ToolKind::Wheel => {
            let mut argv = to_owned(&["python", "-m", "pip", "wheel"]);
            if !cfg.wheel_all_deps {
                argv.push("--no-deps".into());
            }
            argv.extend(to_owned(&["--wheel-dir", "{wheel_dir}", "."]));
            return argv;
        }
    };

    argv.push("{src}".into());
    if layout.has_tests {
        argv.push("{tests}".into());
    }
    argv
}

/// `--always-true` for the selected binding, `--always-false` for the rest.
fn qt_flags(api: QtApi) -> Vec<String> {
    if api == QtApi::Unused {
        return Vec::new();
    }
    QtApi::BINDINGS
        .iter()
        .map(|(binding, name)| {
            let truth = if *binding == api { "true" } else { "false" };
            format!("--always-{truth}={name}")
        })
        .collect()
}

fn pytest_template(cfg: &ToolchainConfig) -> Vec<String> {
    let mut argv = to_owned(&["pytest", "-vv"]);
    if cfg.pytest_parallel {
        argv.extend(to_owned(&["-n", "auto", "--dist", "loadfile"]));
    }
    if cfg.pytest_last_failed {
        argv.push("--lf".into());
    }

    let whole_source = cfg.coverage || !cfg.coverage_reports.is_empty();
    if whole_source {
        argv.push("--cov={src}".into());
    } else {
        argv.extend(cfg.coverage_only.iter().map(|t| format!("--cov={}", coverage_target(t))));
    }
    if whole_source || !cfg.coverage_only.is_empty() {
        argv.push("--cov-report=term-missing:skip-covered".into());
    }
    if cfg.coverage_reports.contains(&CoverageReport::Xml) {
        argv.extend(to_owned(&["--cov-report=xml", "--junitxml=report.xml"]));
    }
    if cfg.coverage_reports.contains(&CoverageReport::Html) {
        argv.push("--cov-report=html".into());
    }

    argv.push("{tests}".into());
    argv
}

/// A `.py` path under the source directory becomes its dotted module
/// name (`src/pkg/core.py` -> `pkg.core`); anything else is passed as is.
fn coverage_target(raw: &str) -> String {
    let Some(path) = raw.strip_suffix(".py") else {
        return raw.to_string();
    };
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|p| !p.is_empty())
        .collect();
    match parts.split_first() {
        Some((_, rest)) if !rest.is_empty() => rest.join("."),
        _ => parts.join("."),
    }
}

fn to_owned(argv: &[&str]) -> Vec<String> {
    argv.iter().map(|a| a.to_string()).collect()
}

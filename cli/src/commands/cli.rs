use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use maestro_plugins::toolchain::parse_assignment;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    Text,
    Jsonl,
}

impl EventFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "maestro", version, about = "Run a Python package's quality checks as one pipeline")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Stage configuration file (default: <package>/maestro.toml, then
    /// [tool.maestro] in <package>/pyproject.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Package directory the stages run in.
    #[arg(long, default_value = ".", global = true)]
    pub package: String,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Groups or stage ids to run. Empty means every stage.
    pub targets: Vec<String>,

    /// Do not pull in dependencies of the selected stages.
    #[arg(long)]
    pub only: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Maximum stages running at once.
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Keep running independent stages after a failure.
    #[arg(long)]
    pub keep_going: bool,

    /// Per-stage timeout, STAGE=SECS (0 disables it). Repeatable.
    #[arg(long = "timeout", value_parser = parse_assignment::<u64>, action = clap::ArgAction::Append)]
    pub timeouts: Vec<(String, u64)>,

    /// Per-stage retry count, STAGE=N. Repeatable.
    #[arg(long = "retries", value_parser = parse_assignment::<u32>, action = clap::ArgAction::Append)]
    pub retries: Vec<(String, u32)>,

    /// Let formatters and linters rewrite files.
    #[arg(long)]
    pub fix: bool,

    /// Live event output. Without it a progress display is shown on a terminal.
    #[arg(long, value_enum)]
    pub format: Option<EventFormat>,

    /// Final report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    /// Mirror stage output to the terminal while it runs.
    #[arg(long)]
    pub stream_output: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyprojectTarget {
    Ruff,
    Isort,
    Mypy,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PyprojectArgs {
    #[arg(value_enum)]
    pub tool: PyprojectTarget,

    /// Replace existing settings (mypy settings are never replaced).
    #[arg(short = 'f', long)]
    pub forced: bool,

    /// Directory containing pyproject.toml.
    #[arg(long, default_value = ".")]
    pub parent_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run stages.
    Run(RunArgs),
    /// Print the wave plan without running anything.
    Plan(SelectArgs),
    /// Add lint tool settings to pyproject.toml.
    Pyproject(PyprojectArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn run_flags() {
        let args = parse(&[
            "maestro",
            "--package",
            "pkg",
            "run",
            "lint",
            "test",
            "-j",
            "2",
            "--keep-going",
            "--timeout",
            "test=30",
            "--retries",
            "test=2",
            "--retries",
            "lint=1",
            "--format",
            "jsonl",
            "--report",
            "json",
        ]);
        assert_eq!(args.package, "pkg");
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.select.targets, vec!["lint", "test"]);
        assert_eq!(run.jobs, Some(2));
        assert!(run.keep_going);
        assert_eq!(run.timeouts, vec![("test".to_string(), 30)]);
        assert_eq!(
            run.retries,
            vec![("test".to_string(), 2), ("lint".to_string(), 1)]
        );
        assert_eq!(run.format, Some(EventFormat::Jsonl));
        assert_eq!(run.report, ReportFormat::Json);
    }

    #[test]
    fn bad_override_is_a_usage_error() {
        assert!(Args::try_parse_from(["maestro", "run", "--timeout", "test"]).is_err());
        assert!(Args::try_parse_from(["maestro", "run", "--retries", "test=x"]).is_err());
    }

    #[test]
    fn plan_and_pyproject() {
        let args = parse(&["maestro", "plan", "package", "--only"]);
        let Commands::Plan(select) = args.command else {
            panic!("expected plan");
        };
        assert!(select.only);
        assert_eq!(select.targets, vec!["package"]);

        let args = parse(&["maestro", "pyproject", "isort", "--forced", "--parent-dir", "x"]);
        let Commands::Pyproject(py) = args.command else {
            panic!("expected pyproject");
        };
        assert_eq!(py.tool, PyprojectTarget::Isort);
        assert!(py.forced);
        assert_eq!(py.parent_dir, PathBuf::from("x"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse(&["maestro", "plan", "--config", "ci.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("ci.toml")));
        assert_eq!(args.package, ".");
    }
}

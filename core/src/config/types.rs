use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;
use crate::executor::types::StageLike;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Explicit stage list. Empty means "use the built-in toolchain graph".
    #[serde(default)]
    pub stages: Vec<StageSpec>,

    /// Named stage groups; merged over the built-in groups.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "maestro_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Worker limit per wave. Unset means one worker per CPU.
    #[serde(default)]
    pub max_parallel: Option<usize>,

    /// Bytes kept from each output stream per attempt.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    /// Timeout for stages that do not set one; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    #[serde(default)]
    pub kill_grace_ms: u64,

    #[serde(default)]
    pub stream_output: bool,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_capture_bytes() -> usize {
    64 * 1024
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            capture_bytes: default_capture_bytes(),
            default_timeout_secs: default_timeout_secs(),
            kill_grace_ms: 0,
            stream_output: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn effective_max_parallel(&self) -> usize {
        self.max_parallel
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get)
            .max(1)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_secs > 0).then(|| Duration::from_secs(self.default_timeout_secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategyKind {
    #[default]
    None,
    Linear,
    ExponentialBackoff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub strategy: RetryStrategyKind,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategyKind::None,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linter {
    #[default]
    Ruff,
    Flake8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageReport {
    Xml,
    Html,
}

/// Qt binding selected through QtPy; mypy gets one `--always-true` and
/// three `--always-false` flags for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QtApi {
    #[default]
    Pyqt5,
    Pyqt6,
    Pyside2,
    Pyside6,
    /// No Qt flags at all.
    #[serde(rename = "none")]
    Unused,
}

impl QtApi {
    pub const BINDINGS: [(Self, &'static str); 4] = [
        (Self::Pyqt5, "PYQT5"),
        (Self::Pyqt6, "PYQT6"),
        (Self::Pyside2, "PYSIDE2"),
        (Self::Pyside6, "PYSIDE6"),
    ];
}

/// Settings feeding the built-in tool templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub linter: Linter,

    #[serde(default = "default_line_length")]
    pub line_length: u32,

    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    #[serde(default = "default_tests_dir")]
    pub tests_dir: String,

    /// Let formatters and linters rewrite files instead of only checking.
    #[serde(default)]
    pub fix: bool,

    #[serde(default)]
    pub pytest_parallel: bool,

    /// Re-run only the tests that failed last time (`--lf`).
    #[serde(default)]
    pub pytest_last_failed: bool,

    #[serde(default)]
    pub coverage: bool,

    /// Extra coverage reports. Any entry turns coverage on.
    #[serde(default)]
    pub coverage_reports: Vec<CoverageReport>,

    /// Measure coverage for these modules or files only, instead of the
    /// whole source directory.
    #[serde(default)]
    pub coverage_only: Vec<String>,

    #[serde(default)]
    pub mypy_strict: bool,

    /// Qt binding mypy treats as installed.
    #[serde(default)]
    pub qt_api: QtApi,

    #[serde(default = "default_wheel_dir")]
    pub wheel_dir: String,

    /// Also build wheels for every dependency.
    #[serde(default)]
    pub wheel_all_deps: bool,
}

fn default_line_length() -> u32 {
    95
}

fn default_src_dir() -> String {
    "src".to_string()
}

fn default_tests_dir() -> String {
    "tests".to_string()
}

fn default_wheel_dir() -> String {
    "dist".to_string()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            linter: Linter::default(),
            line_length: default_line_length(),
            src_dir: default_src_dir(),
            tests_dir: default_tests_dir(),
            fix: false,
            pytest_parallel: false,
            pytest_last_failed: false,
            coverage: false,
            coverage_reports: Vec::new(),
            coverage_only: Vec::new(),
            mypy_strict: false,
            qt_api: QtApi::default(),
            wheel_dir: default_wheel_dir(),
            wheel_all_deps: false,
        }
    }
}

/// Built-in tools a stage can name instead of spelling out a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Black,
    Isort,
    Ruff,
    Flake8,
    Mypy,
    Pytest,
    Wheel,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Isort => "isort",
            Self::Ruff => "ruff",
            Self::Flake8 => "flake8",
            Self::Mypy => "mypy",
            Self::Pytest => "pytest",
            Self::Wheel => "wheel",
        }
    }
}

/// One `[[stages]]` entry as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub id: String,

    #[serde(default)]
    pub tool: Option<ToolKind>,

    /// Explicit argv template; the first element is the program.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub continue_on_failure: bool,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// What backs a stage: a built-in tool or an explicit argv template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSpec<'a> {
    Tool(ToolKind),
    Custom(&'a [String]),
}

impl StageSpec {
    pub fn tool(id: impl Into<String>, tool: ToolKind) -> Self {
        Self {
            id: id.into(),
            tool: Some(tool),
            command: None,
            depends_on: Vec::new(),
            timeout_secs: None,
            max_retries: 0,
            continue_on_failure: false,
            env: BTreeMap::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Exactly one of `tool` and `command` must be set.
    pub fn command_spec(&self) -> Result<CommandSpec<'_>, ExecutorError> {
        match (&self.tool, &self.command) {
            (Some(tool), None) => Ok(CommandSpec::Tool(*tool)),
            (None, Some(argv)) if argv.is_empty() || argv[0].trim().is_empty() => Err(
                ExecutorError::invalid(&self.id, "command must name a program"),
            ),
            (None, Some(argv)) => Ok(CommandSpec::Custom(argv)),
            (Some(_), Some(_)) => Err(ExecutorError::invalid(
                &self.id,
                "set either `tool` or `command`, not both",
            )),
            (None, None) => Err(ExecutorError::invalid(
                &self.id,
                "one of `tool` or `command` is required",
            )),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl StageLike for StageSpec {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    fn retain_dependencies(&mut self, keep: &dyn Fn(&str) -> bool) {
        self.depends_on.retain(|dep| keep(dep));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.executor.capture_bytes, 65_536);
        assert_eq!(cfg.executor.default_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(cfg.toolchain.line_length, 95);
        assert_eq!(cfg.toolchain.linter, Linter::Ruff);
        assert_eq!(cfg.executor.retry.strategy, RetryStrategyKind::None);
        assert!(cfg.stages.is_empty());
        assert!(!cfg.logging.file);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cfg = ExecutorConfig {
            default_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.default_timeout(), None);
    }

    #[test]
    fn zero_parallelism_falls_back_to_cpus() {
        let cfg = ExecutorConfig {
            max_parallel: Some(0),
            ..Default::default()
        };
        assert!(cfg.effective_max_parallel() >= 1);
        let cfg = ExecutorConfig {
            max_parallel: Some(3),
            ..Default::default()
        };
        assert_eq!(cfg.effective_max_parallel(), 3);
    }

    #[test]
    fn command_spec_requires_exactly_one_source() {
        let mut spec = StageSpec::tool("lint", ToolKind::Ruff);
        assert_eq!(spec.command_spec().unwrap(), CommandSpec::Tool(ToolKind::Ruff));

        spec.command = Some(vec!["ruff".into()]);
        assert!(spec.command_spec().is_err());

        spec.tool = None;
        assert!(matches!(spec.command_spec().unwrap(), CommandSpec::Custom(argv) if argv == ["ruff"]));

        spec.command = None;
        assert!(spec.command_spec().is_err());

        spec.command = Some(Vec::new());
        assert!(spec.command_spec().is_err());
    }

    #[test]
    fn toolchain_options_from_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [toolchain]
            qt_api = "pyside6"
            mypy_strict = true
            coverage_reports = ["xml", "html"]
            coverage_only = ["src/pkg/core.py"]
            wheel_all_deps = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.toolchain.qt_api, QtApi::Pyside6);
        assert!(cfg.toolchain.mypy_strict);
        assert_eq!(
            cfg.toolchain.coverage_reports,
            vec![CoverageReport::Xml, CoverageReport::Html]
        );
        assert_eq!(cfg.toolchain.coverage_only, vec!["src/pkg/core.py"]);
        assert!(cfg.toolchain.wheel_all_deps);
        assert!(!cfg.toolchain.pytest_last_failed);

        let cfg: AppConfig = toml::from_str("[toolchain]\nqt_api = \"none\"\n").unwrap();
        assert_eq!(cfg.toolchain.qt_api, QtApi::Unused);
        assert_eq!(ToolchainConfig::default().qt_api, QtApi::Pyqt5);
    }
}

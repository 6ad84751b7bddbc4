//! Writes lint tool settings into a package's `pyproject.toml`.
//!
//! The file is parsed and re-serialized whole, so comments and key order
//! are not preserved.

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

pub const PYPROJECT_FILE: &str = "pyproject.toml";

const RUFF_TARGET_VERSION: &str = "py37";
const LINE_LENGTH: i64 = 95;

const RUFF_SELECT: &[&str] = &[
    "F", "E", "W", "N", "UP", "YTT", "ANN", "BLE", "B", "A", "COM", "C4", "T10", "EM", "EXE",
    "ISC", "ICN", "LOG", "G", "INP", "PIE", "T20", "PYI", "PT", "Q", "RSE", "RET", "SLOT", "SLF",
    "SIM", "TID", "TCH", "INT", "ARG", "PTH", "TD", "PD", "PGH", "PL", "TRY", "FLY", "NPY",
    "PERF", "FURB", "RUF",
];

const RUFF_IGNORE: &[&str] = &[
    "ANN401", "ARG001", "ARG002", "COM812", "EM101", "PD011", "PLC1901", "PLR0911", "PLR0912",
    "PLR0913", "PLR0915", "PLR2004", "PTH123", "RET501", "RET505", "RET506", "SIM108", "SIM116",
    "TD002", "TD003", "TC001", "TC002", "TC003", "TRY002", "TRY003", "UP006", "UP007",
];

const ISORT_SECTIONS: &str = "LOCALFOLDER,FIRSTPARTY,THIRDPARTY,STDLIB,FUTURE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyprojectTool {
    Ruff,
    Isort,
    Mypy,
}

impl PyprojectTool {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ruff => "ruff",
            Self::Isort => "isort",
            Self::Mypy => "mypy",
        }
    }
}

#[derive(Error, Debug)]
pub enum PyprojectError {
    #[error("The file '{}' doesn't exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{key}' in '{table}' is already configured. Add --forced to overwrite the existing configuration.")]
    KeyConfigured { table: String, key: String },

    #[error("{0} is already configured. Add --forced to overwrite the existing configuration.")]
    TableConfigured(String),

    #[error("{0} is already configured.")]
    Locked(String),

    #[error("'{0}' is not a table")]
    NotATable(String),

    #[error("invalid {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize pyproject: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Add the `tool` settings to `<parent_dir>/pyproject.toml` and return the
/// path written.
pub fn configure(tool: PyprojectTool, parent_dir: &Path, forced: bool) -> Result<PathBuf, PyprojectError> {
    let path = parent_dir.join(PYPROJECT_FILE);
    if !path.is_file() {
        return Err(PyprojectError::NotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    let mut doc: Table = content.parse().map_err(|source| PyprojectError::Parse {
        file: path.display().to_string(),
        source,
    })?;

    match tool {
        PyprojectTool::Ruff => configure_ruff(&mut doc, forced)?,
        PyprojectTool::Isort => configure_isort(&mut doc, forced)?,
        PyprojectTool::Mypy => configure_mypy(&mut doc)?,
    }

    std::fs::write(&path, toml::to_string(&doc)?)?;
    tracing::info!(tool = tool.as_str(), path = %path.display(), "pyproject updated");
    Ok(path)
}

pub fn configure_ruff(doc: &mut Table, forced: bool) -> Result<(), PyprojectError> {
    let tool = child_table(doc, "tool", "tool")?;
    let ruff = child_table(tool, "ruff", "tool.ruff")?;
    if !forced {
        refuse_existing(ruff, "tool.ruff", &["target-version", "line-length"])?;
    }
    ruff.insert("target-version".into(), Value::from(RUFF_TARGET_VERSION));
    ruff.insert("line-length".into(), Value::from(LINE_LENGTH));

    let lint = child_table(ruff, "lint", "tool.ruff.lint")?;
    if !forced {
        refuse_existing(lint, "tool.ruff.lint", &["select", "ignore"])?;
    }
    lint.insert("select".into(), string_array(RUFF_SELECT));
    lint.insert("ignore".into(), string_array(RUFF_IGNORE));
    Ok(())
}

pub fn configure_isort(doc: &mut Table, forced: bool) -> Result<(), PyprojectError> {
    let tool = child_table(doc, "tool", "tool")?;
    if !forced && tool.contains_key("isort") {
        return Err(PyprojectError::TableConfigured("tool.isort".into()));
    }
    let mut isort = Table::new();
    isort.insert("sections".into(), Value::from(ISORT_SECTIONS));
    isort.insert("multi_line_output".into(), Value::from(3i64));
    isort.insert("line_length".into(), Value::from(LINE_LENGTH));
    isort.insert("use_parentheses".into(), Value::from(true));
    isort.insert("include_trailing_comma".into(), Value::from(true));
    isort.insert("force_grid_wrap".into(), Value::from(0i64));
    isort.insert("ensure_newline_before_comments".into(), Value::from(true));
    tool.insert("isort".into(), Value::Table(isort));
    Ok(())
}

/// mypy settings are never overwritten.
pub fn configure_mypy(doc: &mut Table) -> Result<(), PyprojectError> {
    let tool = child_table(doc, "tool", "tool")?;
    if tool.contains_key("mypy") || tool.contains_key("overrides") {
        return Err(PyprojectError::Locked("tool.mypy".into()));
    }
    let mut override_entry = Table::new();
    override_entry.insert("module".into(), string_array(&["importlib_metadata.*"]));
    override_entry.insert("ignore_missing_imports".into(), Value::from(true));

    let mut mypy = Table::new();
    mypy.insert(
        "overrides".into(),
        Value::Array(vec![Value::Table(override_entry)]),
    );
    tool.insert("mypy".into(), Value::Table(mypy));
    Ok(())
}

fn child_table<'a>(parent: &'a mut Table, key: &str, path: &str) -> Result<&'a mut Table, PyprojectError> {
    parent
        .entry(key)
        .or_insert(Value::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| PyprojectError::NotATable(path.to_string()))
}

fn refuse_existing(table: &Table, path: &str, keys: &[&str]) -> Result<(), PyprojectError> {
    match keys.iter().find(|key| table.contains_key(**key)) {
        Some(key) => Err(PyprojectError::KeyConfigured {
            table: path.to_string(),
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn string_array(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(*s)).collect())
}

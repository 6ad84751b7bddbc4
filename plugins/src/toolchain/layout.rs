use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use maestro_core::config::ToolchainConfig;
use maestro_core::error::ExecutorError;

/// `~`-expanded package directory; blank means the current directory.
pub fn expand_package_dir(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() {
        return PathBuf::from(".");
    }
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Where the checked package keeps its sources and tests.
#[derive(Debug, Clone)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub src_dir: String,
    pub tests_dir: String,
    pub wheel_dir: String,
    pub line_length: u32,
    pub has_src: bool,
    pub has_tests: bool,
}

impl PackageLayout {
    /// Inspect `package_dir` (`~` is expanded). The directory itself must
    /// exist; missing `src`/`tests` are only recorded here.
    pub fn inspect(package_dir: &str, cfg: &ToolchainConfig) -> Result<Self, ExecutorError> {
        let expanded = expand_package_dir(package_dir);
        let root = std::fs::canonicalize(&expanded)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| ExecutorError::PackageNotFound(expanded.display().to_string()))?;

        let has_src = root.join(&cfg.src_dir).is_dir();
        let has_tests = root.join(&cfg.tests_dir).is_dir();
        tracing::debug!(
            root = %root.display(),
            has_src,
            has_tests,
            "inspected package layout"
        );

        Ok(Self {
            root,
            src_dir: cfg.src_dir.clone(),
            tests_dir: cfg.tests_dir.clone(),
            wheel_dir: cfg.wheel_dir.clone(),
            line_length: cfg.line_length,
            has_src,
            has_tests,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Values for `{package}`, `{src}`, `{tests}`, `{wheel_dir}` and
    /// `{line_length}` in command templates.
    pub fn placeholders(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("package".to_string(), self.root.display().to_string());
        vars.insert("src".to_string(), self.src_dir.clone());
        vars.insert("tests".to_string(), self.tests_dir.clone());
        vars.insert("wheel_dir".to_string(), self.wheel_dir.clone());
        vars.insert("line_length".to_string(), self.line_length.to_string());
        vars
    }
}

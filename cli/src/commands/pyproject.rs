//! `maestro pyproject`: add lint tool settings to pyproject.toml.
use maestro_core::api as core_api;
use maestro_plugins::pyproject::{configure, PyprojectError, PyprojectTool};

use crate::commands::cli::{PyprojectArgs, PyprojectTarget};

pub fn handle_pyproject(args: PyprojectArgs) -> Result<i32, core_api::CliError> {
    let tool = match args.tool {
        PyprojectTarget::Ruff => PyprojectTool::Ruff,
        PyprojectTarget::Isort => PyprojectTool::Isort,
        PyprojectTarget::Mypy => PyprojectTool::Mypy,
    };
    let path = configure(tool, &args.parent_dir, args.forced).map_err(|e| match e {
        PyprojectError::Io(io) => core_api::CliError::Io(io),
        other => core_api::CliError::Config(other.to_string()),
    })?;
    println!("Updated [tool.{}] in {}", tool.as_str(), path.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(tool: PyprojectTarget, dir: PathBuf) -> PyprojectArgs {
        PyprojectArgs {
            tool,
            forced: false,
            parent_dir: dir,
        }
    }

    #[test]
    fn refusal_maps_to_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "[tool.mypy]\n").unwrap();
        let err = handle_pyproject(args(PyprojectTarget::Mypy, dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, core_api::CliError::Config(msg) if msg == "tool.mypy is already configured."));
    }

    #[test]
    fn writes_isort_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "").unwrap();
        assert_eq!(
            handle_pyproject(args(PyprojectTarget::Isort, dir.path().to_path_buf())).unwrap(),
            0
        );
        let written = std::fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(written.contains("[tool.isort]"));
    }
}

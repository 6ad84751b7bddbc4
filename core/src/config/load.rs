use std::path::Path;

use anyhow::Context;

use super::types::AppConfig;

/// Per-package configuration file name.
pub const CONFIG_FILE_NAME: &str = "maestro.toml";

pub const ENV_MAX_PARALLEL: &str = "MAESTRO_MAX_PARALLEL";
pub const ENV_LOG_LEVEL: &str = "MAESTRO_LOG_LEVEL";

/// Load the configuration for the package rooted at `package_dir`.
///
/// Priority: `explicit` path, then `maestro.toml` in the package, then
/// `[tool.maestro]` in its `pyproject.toml`, then built-in defaults.
/// Environment overrides are applied last.
pub fn load_for_package(package_dir: &Path, explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let local_config = package_dir.join(CONFIG_FILE_NAME);
    let pyproject = package_dir.join("pyproject.toml");

    let mut cfg = if let Some(path) = explicit {
        read_config(path)?
    } else if local_config.exists() {
        read_config(&local_config)?
    } else if pyproject.exists() {
        read_pyproject_table(&pyproject)?.unwrap_or_default()
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

pub fn parse_str(s: &str) -> anyhow::Result<AppConfig> {
    Ok(toml::from_str::<AppConfig>(s)?)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    parse_str(&s).with_context(|| format!("invalid config file {}", path.display()))
}

/// `[tool.maestro]` from a pyproject file, if the table exists.
fn read_pyproject_table(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let doc: toml::Table =
        toml::from_str(&s).with_context(|| format!("invalid TOML in {}", path.display()))?;

    let Some(table) = doc
        .get("tool")
        .and_then(|tool| tool.get("maestro"))
        .cloned()
    else {
        return Ok(None);
    };

    let cfg = table
        .try_into::<AppConfig>()
        .with_context(|| format!("invalid [tool.maestro] table in {}", path.display()))?;
    Ok(Some(cfg))
}

/// Apply `MAESTRO_*` overrides. Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_MAX_PARALLEL).filter(|v| !v.trim().is_empty()) {
        let n: usize = v
            .trim()
            .parse()
            .with_context(|| format!("{ENV_MAX_PARALLEL} must be a positive integer, got {v:?}"))?;
        if n == 0 {
            anyhow::bail!("{ENV_MAX_PARALLEL} must be a positive integer, got 0");
        }
        cfg.executor.max_parallel = Some(n);
    }

    if let Some(v) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
        cfg.logging.level = v.trim().to_string();
    }

    Ok(())
}

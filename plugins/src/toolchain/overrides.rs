use std::str::FromStr;

use maestro_core::config::StageSpec;
use maestro_core::error::ExecutorError;

/// Per-invocation adjustments layered over configured stages.
#[derive(Debug, Clone, Default)]
pub struct StageOverrides {
    /// `STAGE=SECS`; 0 disables the timeout.
    pub timeouts: Vec<(String, u64)>,
    pub retries: Vec<(String, u32)>,
    /// Force `continue_on_failure` on every stage.
    pub keep_going: bool,
}

impl StageOverrides {
    pub fn apply(&self, specs: &mut [StageSpec]) -> Result<(), ExecutorError> {
        for (stage_id, secs) in &self.timeouts {
            find(specs, stage_id)?.timeout_secs = Some(*secs);
        }
        for (stage_id, retries) in &self.retries {
            find(specs, stage_id)?.max_retries = *retries;
        }
        if self.keep_going {
            for spec in specs.iter_mut() {
                spec.continue_on_failure = true;
            }
        }
        Ok(())
    }
}

fn find<'a>(specs: &'a mut [StageSpec], stage_id: &str) -> Result<&'a mut StageSpec, ExecutorError> {
    specs
        .iter_mut()
        .find(|s| s.id == stage_id)
        .ok_or_else(|| ExecutorError::UnknownStage(stage_id.to_string()))
}

/// Parse `NAME=VALUE`.
pub fn parse_assignment<T>(raw: &str) -> Result<(String, T), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing stage name in '{raw}'"));
    }
    let value = value
        .trim()
        .parse::<T>()
        .map_err(|e| format!("invalid value in '{raw}': {e}"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::config::ToolKind;

    fn specs() -> Vec<StageSpec> {
        vec![
            StageSpec::tool("lint", ToolKind::Ruff),
            StageSpec::tool("test", ToolKind::Pytest).depends_on(["lint"]),
        ]
    }

    #[test]
    fn parses_assignments() {
        assert_eq!(parse_assignment::<u64>("test=30").unwrap(), ("test".to_string(), 30));
        assert_eq!(parse_assignment::<u32>(" lint = 2 ").unwrap(), ("lint".to_string(), 2));
        assert!(parse_assignment::<u64>("test").is_err());
        assert!(parse_assignment::<u64>("=3").is_err());
        assert!(parse_assignment::<u64>("test=soon").is_err());
        assert!(parse_assignment::<u32>("test=-1").is_err());
    }

    #[test]
    fn applies_overrides() {
        let mut specs = specs();
        let overrides = StageOverrides {
            timeouts: vec![("test".into(), 30)],
            retries: vec![("lint".into(), 2)],
            keep_going: true,
        };
        overrides.apply(&mut specs).unwrap();

        assert_eq!(specs[1].timeout_secs, Some(30));
        assert_eq!(specs[0].max_retries, 2);
        assert!(specs.iter().all(|s| s.continue_on_failure));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let mut specs = specs();
        let overrides = StageOverrides {
            retries: vec![("typo".into(), 1)],
            ..Default::default()
        };
        let err = overrides.apply(&mut specs).unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownStage(id) if id == "typo"));
    }
}

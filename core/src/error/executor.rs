use thiserror::Error;

/// Errors detected while building or validating a stage set.
///
/// All of these are configuration errors: they are raised before any
/// process is spawned and the run never starts.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate stage ID: {0}")]
    DuplicateStageId(String),

    #[error("Dependency not found: stage '{stage_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        stage_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Unknown stage or group: {0}")]
    UnknownStage(String),

    #[error("Invalid stage '{stage_id}': {reason}")]
    InvalidStage { stage_id: String, reason: String },

    #[error("Package directory not found: {0}")]
    PackageNotFound(String),
}

impl ExecutorError {
    pub fn invalid(stage_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStage {
            stage_id: stage_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_stage_message() {
        let err = ExecutorError::invalid("test", "tests directory 'tests' not found");
        assert_eq!(
            err.to_string(),
            "Invalid stage 'test': tests directory 'tests' not found"
        );
    }

    #[test]
    fn dependency_message_names_both_stages() {
        let err = ExecutorError::DependencyNotFound {
            stage_id: "test".into(),
            missing_dep: "lnt".into(),
        };
        assert_eq!(
            err.to_string(),
            "Dependency not found: stage 'test' depends on 'lnt'"
        );
    }
}

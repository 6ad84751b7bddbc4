use std::time::Duration;

use crate::runner::ResolvedCommand;

/// Immutable definition of one unit of work.
#[derive(Debug, Clone)]
pub struct Stage {
    pub id: String,
    pub command: ResolvedCommand,
    pub depends_on: Vec<String>,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub continue_on_failure: bool,
}

impl Stage {
    pub fn new(id: impl Into<String>, command: ResolvedCommand) -> Self {
        Self {
            id: id.into(),
            command,
            depends_on: Vec::new(),
            timeout: None,
            max_retries: 0,
            continue_on_failure: false,
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.depends_on.contains(&dep) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn continue_on_failure(mut self, value: bool) -> Self {
        self.continue_on_failure = value;
        self
    }
}

/// Common stage interface for graph handling.
pub trait StageLike: Clone + Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[String];
    /// Drop dependencies for which `keep` returns false.
    fn retain_dependencies(&mut self, keep: &dyn Fn(&str) -> bool);
}

impl StageLike for Stage {
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

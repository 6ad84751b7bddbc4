use std::time::Duration;

/// Back-off between attempts of a failing stage.
///
/// How many attempts a stage gets is a property of the stage itself
/// (`max_retries`); the strategy only decides how long to wait.
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    fn next_delay(&self, attempt: u32) -> Duration;
}

use maestro_core::config::RetryConfig;
use maestro_core::executor::traits::RetryStrategyPlugin;
use std::time::Duration;

/// Retries immediately.
pub struct NoDelayRetryPlugin;

pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for NoDelayRetryPlugin {
    fn name(&self) -> &str {
        "none"
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        Duration::from_millis(delay.min(self.config.max_delay_ms))
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let multiplier = u64::from(attempt.max(1));
        let delay = self.config.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay.min(self.config.max_delay_ms))
    }
}

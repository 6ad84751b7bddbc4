use std::sync::Arc;

use anyhow::{bail, Result};

use maestro_core::config::{RetryConfig, RetryStrategyKind};
use maestro_core::executor::traits::{OutputRendererPlugin, RetryStrategyPlugin};

use crate::executor::{
    ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, NoDelayRetryPlugin,
    TextRendererPlugin,
};

pub fn build_renderer(format: &str, ascii_only: bool) -> Result<Arc<dyn OutputRendererPlugin>> {
    match format {
        "text" => Ok(Arc::new(TextRendererPlugin::new(ascii_only))),
        "jsonl" => Ok(Arc::new(JsonlRendererPlugin::new(false))),
        other => bail!("unknown output format: {other} (expected text or jsonl)"),
    }
}

pub fn build_retry_strategy(cfg: &RetryConfig) -> Arc<dyn RetryStrategyPlugin> {
    match cfg.strategy {
        RetryStrategyKind::None => Arc::new(NoDelayRetryPlugin),
        RetryStrategyKind::Linear => Arc::new(LinearRetryPlugin::new(cfg.clone())),
        RetryStrategyKind::ExponentialBackoff => {
            Arc::new(ExponentialBackoffPlugin::new(cfg.clone()))
        }
    }
}

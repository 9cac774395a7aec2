use std::time::Duration;

use fanout_core::Severity;

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// Upper bound on the worker pool; larger requests are clamped.
pub const MAX_WORKERS: usize = 100;

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub max_workers: usize,
    /// Applies to each attempt separately. An attempt that overruns fails with a
    /// `RequestTimeout` error, which is classified as a retryable timeout.
    pub per_task_timeout: Option<Duration>,
    pub retry: RetryConfig,
    /// Severity recorded for classified failures. Unclassified failures are always critical.
    pub default_severity: Severity,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_workers: 20,
            per_task_timeout: None,
            retry: RetryConfig::default(),
            default_severity: Severity::Warning,
        }
    }
}

impl ExecutionConfig {
    /// Validate and clamp `max_workers` to `1..=MAX_WORKERS`.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::MaxWorkers(0));
        }
        if self.max_workers > MAX_WORKERS {
            tracing::warn!(
                requested = self.max_workers,
                max = MAX_WORKERS,
                "clamping max_workers"
            );
            self.max_workers = MAX_WORKERS;
        }
        self.retry.validate()?;
        Ok(self)
    }
}

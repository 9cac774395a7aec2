#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_workers must be >= 1, got {0}")]
    MaxWorkers(usize),
    #[error("rate limit for {service}: requests_per_second must be > 0, got {value}")]
    RequestsPerSecond { service: String, value: f64 },
    #[error("rate limit for {service}: burst_size must be >= 1")]
    BurstSize { service: String },
    #[error("retry factor must be >= 1.0, got {0}")]
    RetryFactor(f64),
    #[error("quota cache max_entries must be >= 1")]
    QuotaCacheSize,
    #[error(transparent)]
    QuotaThresholds(#[from] fanout_core::InvalidThresholds),
}

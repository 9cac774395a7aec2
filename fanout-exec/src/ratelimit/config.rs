use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SERVICE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Steady-state refill rate.
    pub requests_per_second: f64,
    /// Bucket capacity; also the number of tokens a fresh bucket starts with.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    pub const fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    pub fn validate(&self, service: &str) -> Result<(), ConfigError> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(ConfigError::RequestsPerSecond {
                service: service.to_string(),
                value: self.requests_per_second,
            });
        }
        if self.burst_size == 0 {
            return Err(ConfigError::BurstSize {
                service: service.to_string(),
            });
        }
        Ok(())
    }
}

/// Conservative per-service presets, well under published provider limits.
pub const PRESETS: &[(&str, RateLimitConfig)] = &[
    (DEFAULT_SERVICE, RateLimitConfig::new(10.0, 20)),
    ("ec2", RateLimitConfig::new(20.0, 40)),
    ("iam", RateLimitConfig::new(10.0, 20)),
    ("organizations", RateLimitConfig::new(4.0, 8)),
    ("sts", RateLimitConfig::new(10.0, 20)),
    ("s3", RateLimitConfig::new(50.0, 100)),
    ("lambda", RateLimitConfig::new(15.0, 30)),
    ("cloudwatch", RateLimitConfig::new(20.0, 40)),
    ("service-quotas", RateLimitConfig::new(5.0, 10)),
];

/// Preset for `service`, falling back to the `default` preset.
pub fn preset_for(service: &str) -> RateLimitConfig {
    PRESETS
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, cfg)| *cfg)
        .unwrap_or_default()
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::ratelimit::{preset_for, RateLimitConfig, TokenBucket};

/// Process-wide set of per-service token buckets.
///
/// Construct one per process and hand it to every executor so that all runs against the
/// same service share one bucket. Buckets are created lazily on first use.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    overrides: BTreeMap<String, RateLimitConfig>,
    buckets: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preset for `service`. Takes effect for buckets created afterwards.
    pub fn with_override(
        mut self,
        service: impl Into<String>,
        config: RateLimitConfig,
    ) -> Result<Self, ConfigError> {
        let service = service.into();
        config.validate(&service)?;
        self.overrides.insert(service, config);
        Ok(self)
    }

    pub fn overrides(&self) -> &BTreeMap<String, RateLimitConfig> {
        &self.overrides
    }

    /// Override, then built-in preset, then the `default` preset. Always valid.
    pub fn config_for(&self, service: &str) -> RateLimitConfig {
        self.overrides
            .get(service)
            .copied()
            .unwrap_or_else(|| preset_for(service))
    }

    /// The shared bucket for `service`; every call with the same name returns the same bucket.
    pub fn get(&self, service: &str) -> Arc<TokenBucket> {
        let mut buckets = self.buckets.lock();
        if let Some(bucket) = buckets.get(service) {
            return bucket.clone();
        }
        let bucket = Arc::new(TokenBucket::full(self.config_for(service)));
        buckets.insert(service.to_string(), bucket.clone());
        bucket
    }

    /// Names of services whose bucket has been created.
    pub fn active_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop all buckets; the next `get` starts from a full bucket.
    pub fn reset(&self) {
        self.buckets.lock().clear();
    }
}

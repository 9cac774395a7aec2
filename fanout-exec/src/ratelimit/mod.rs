mod bucket;
mod config;
mod registry;

pub use bucket::TokenBucket;
pub use config::{preset_for, RateLimitConfig, DEFAULT_SERVICE, PRESETS};
pub use registry::RateLimiterRegistry;

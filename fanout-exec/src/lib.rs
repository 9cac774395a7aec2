#![forbid(unsafe_code)]

//! Parallel execution engine: fans a callback out over an account × region matrix under
//! a bounded worker pool, per-service token-bucket rate limits and retry with backoff,
//! and returns a partially-successful [`ExecutionResult`].

pub mod error;
pub mod executor;
pub mod quota;
pub mod ratelimit;
pub mod retry;

pub use crate::error::ConfigError;
pub use crate::executor::{
    ExecutionConfig, ExecutionError, ExecutionResult, Executor, Records, SessionProvider,
    StaticSessionProvider, TaskContext,
};
pub use crate::quota::{QuotaChecker, QuotaConfig, QuotaLookup, QuotaSource, QuotaSourceError};
pub use crate::ratelimit::{RateLimitConfig, RateLimiterRegistry, TokenBucket};
pub use crate::retry::{RetryConfig, RetryDecision, RetryReason};

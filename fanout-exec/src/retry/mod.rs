mod config;
mod decision;

pub use config::{Jitter, RetryConfig};
pub use decision::{decide_retry, RetryDecision, RetryReason};

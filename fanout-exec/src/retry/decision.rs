use std::time::Duration;

use fanout_core::ErrorCategory;

use crate::retry::config::{Jitter, RetryConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::RetryAfter { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable(ErrorCategory),
    AttemptsExhausted,
    RetryAfterHint,
    Backoff(ErrorCategory),
}

/// Decide if a failed attempt should be retried and how long to wait.
///
/// - `attempt_no`: 1-based number of the attempt that just failed.
/// - `category`: classification of its error; only transient categories are retried.
/// - `retry_after`: provider hint; wins over computed backoff, clamped to `max_delay`.
/// - `rand_u64`: RNG for full jitter.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    category: ErrorCategory,
    retry_after: Option<Duration>,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    if !category.is_transient() {
        return RetryDecision::Stop {
            reason: RetryReason::NotRetryable(category),
        };
    }

    if attempt_no >= cfg.max_attempts() {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    if let Some(delay) = retry_after {
        return RetryDecision::RetryAfter {
            delay: delay.min(cfg.max_delay),
            reason: RetryReason::RetryAfterHint,
        };
    }

    // base * factor^(attempt_no-1), capped before jitter.
    let exp = attempt_no.saturating_sub(1).min(i32::MAX as usize) as i32;
    let raw = (cfg.base_delay.as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay.as_millis() as f64).max(0.0) as u64;

    let delay_ms = match cfg.jitter {
        Jitter::Full if raw_ms > 0 => rand_u64() % (raw_ms + 1),
        Jitter::Full => 0,
        Jitter::None => raw_ms,
    };
    RetryDecision::RetryAfter {
        delay: Duration::from_millis(delay_ms),
        reason: RetryReason::Backoff(category),
    }
}

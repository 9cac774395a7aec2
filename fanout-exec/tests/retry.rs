use std::time::Duration;

use fanout_core::ErrorCategory;
use fanout_exec::retry::{decide_retry, Jitter, RetryConfig, RetryDecision, RetryReason};

fn no_jitter() -> RetryConfig {
    RetryConfig {
        jitter: Jitter::None,
        ..RetryConfig::default()
    }
}

#[test]
fn defaults() {
    let cfg = RetryConfig::default();
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.max_attempts(), 4);
    assert_eq!(cfg.base_delay, Duration::from_secs(1));
    assert_eq!(cfg.max_delay, Duration::from_secs(30));
    assert_eq!(cfg.jitter, Jitter::Full);
}

#[test]
fn non_transient_categories_stop_immediately() {
    let cfg = no_jitter();
    for category in [
        ErrorCategory::AccessDenied,
        ErrorCategory::NotFound,
        ErrorCategory::InvalidRequest,
        ErrorCategory::Unknown,
    ] {
        assert_eq!(
            decide_retry(&cfg, 1, category, None, || 0),
            RetryDecision::Stop {
                reason: RetryReason::NotRetryable(category)
            }
        );
    }
}

#[test]
fn exponential_backoff_without_jitter() {
    let cfg = no_jitter();
    let delays: Vec<Duration> = (1..=3)
        .map(|n| match decide_retry(&cfg, n, ErrorCategory::Throttling, None, || 0) {
            RetryDecision::RetryAfter { delay, .. } => delay,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
}

#[test]
fn stops_after_max_attempts() {
    let cfg = no_jitter();
    assert_eq!(
        decide_retry(&cfg, 4, ErrorCategory::Timeout, None, || 0),
        RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted
        }
    );
    assert!(!decide_retry(&RetryConfig::disabled(), 1, ErrorCategory::Throttling, None, || 0)
        .is_retry());
}

#[test]
fn backoff_is_capped() {
    let cfg = RetryConfig {
        max_retries: 20,
        ..no_jitter()
    };
    match decide_retry(&cfg, 15, ErrorCategory::ServiceError, None, || 0) {
        RetryDecision::RetryAfter { delay, reason } => {
            assert_eq!(delay, Duration::from_secs(30));
            assert_eq!(reason, RetryReason::Backoff(ErrorCategory::ServiceError));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn full_jitter_stays_within_bound() {
    let cfg = RetryConfig::default();
    for seed in [0u64, 1, 999, 2000, u64::MAX] {
        match decide_retry(&cfg, 2, ErrorCategory::Throttling, None, || seed) {
            RetryDecision::RetryAfter { delay, .. } => assert!(delay <= Duration::from_secs(2)),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn retry_after_hint_wins_and_is_clamped() {
    let cfg = no_jitter();
    assert_eq!(
        decide_retry(&cfg, 1, ErrorCategory::Throttling, Some(Duration::from_secs(7)), || 0),
        RetryDecision::RetryAfter {
            delay: Duration::from_secs(7),
            reason: RetryReason::RetryAfterHint
        }
    );
    assert_eq!(
        decide_retry(&cfg, 1, ErrorCategory::Throttling, Some(Duration::from_secs(600)), || 0),
        RetryDecision::RetryAfter {
            delay: Duration::from_secs(30),
            reason: RetryReason::RetryAfterHint
        }
    );
}

#[test]
fn factor_below_one_is_invalid() {
    let cfg = RetryConfig {
        factor: 0.5,
        ..RetryConfig::default()
    };
    assert!(cfg.validate().is_err());
}

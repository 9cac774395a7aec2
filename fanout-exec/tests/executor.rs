use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::{Account, ErrorCategory, ProviderError, Severity};
use fanout_exec::executor::{
    CountingTracker, ExecutionConfig, ExecutionError, ExecutionResult, Executor, SessionProvider,
    StaticSessionProvider, TaskContext,
};
use fanout_exec::ratelimit::{RateLimitConfig, RateLimiterRegistry};
use fanout_exec::retry::{Jitter, RetryConfig};

fn accounts(ids: &[&str]) -> Vec<Account> {
    ids.iter().map(|id| Account::new(*id, format!("acct-{id}"))).collect()
}

fn regions(names: &[&str]) -> Vec<String> {
    names.iter().map(|r| r.to_string()).collect()
}

fn quick_retry() -> RetryConfig {
    RetryConfig {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        ..RetryConfig::default()
    }
}

fn executor(config: ExecutionConfig) -> Executor<StaticSessionProvider<()>> {
    Executor::new(
        config,
        Arc::new(StaticSessionProvider::new(())),
        Arc::new(RateLimiterRegistry::new()),
    )
    .unwrap()
}

fn default_executor() -> Executor<StaticSessionProvider<()>> {
    executor(ExecutionConfig {
        retry: quick_retry(),
        ..ExecutionConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn flat_data_follows_task_order() {
    let result = default_executor()
        .execute(
            &accounts(&["111", "222"]),
            &regions(&["us-east-1", "eu-west-1"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                // finish in reverse order
                let delay = if ctx.account_id() == "111" { 40 } else { 5 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(Some(vec![format!("{}:{}", ctx.account_id(), ctx.region())]))
            },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count(), 4);
    assert_eq!(result.error_count(), 0);
    assert_eq!(
        result.flat_data(),
        vec![
            "111:us-east-1",
            "111:eu-west-1",
            "222:us-east-1",
            "222:eu-west-1"
        ]
    );
    assert_eq!(result.error_summary(), "no errors");
    assert!(!result.has_any_failure());
}

#[tokio::test(start_paused = true)]
async fn none_data_counts_as_success() {
    let result: ExecutionResult<Vec<u32>> = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1", "us-west-2"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                if ctx.region() == "us-west-2" {
                    Ok(None)
                } else {
                    Ok(Some(vec![1, 2]))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count(), 2);
    assert_eq!(result.data(), vec![Some(&vec![1, 2]), None]);
    assert_eq!(result.into_flat_data(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn scalar_outputs_flatten_through_successful_data() {
    let result: ExecutionResult<u32> = default_executor()
        .execute(
            &accounts(&["111", "222"]),
            &regions(&["us-east-1"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                match ctx.account_id() {
                    "111" => Ok(Some(7)),
                    _ => Err(ProviderError::new("NoSuchEntity", "gone")),
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(result.data(), vec![Some(&7), None]);
    assert_eq!(result.successful_data(), vec![&7]);
    assert_eq!(result.into_successful_data(), vec![7]);
}

#[tokio::test(start_paused = true)]
async fn access_denied_is_not_retried_and_downgraded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result: ExecutionResult<Vec<String>> = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1"]),
            "ec2",
            move |_ctx: TaskContext<()>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::new("AccessDenied", "not authorized")
                        .with_operation("DescribeInstances"))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.success_count(), 0);
    assert_eq!(result.error_count(), 1);
    assert!(result.has_failures_only());
    assert!(!result.is_failed_run());

    let errors = result.errors().errors();
    assert_eq!(errors[0].category, ErrorCategory::AccessDenied);
    assert_eq!(errors[0].severity, Severity::Info);
    assert_eq!(errors[0].operation, "DescribeInstances");
    assert_eq!(errors[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn throttling_retries_up_to_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result: ExecutionResult<Vec<String>> = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1"]),
            "ec2",
            move |_ctx: TaskContext<()>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::new("ThrottlingException", "Rate exceeded"))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let errors = result.errors().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category, ErrorCategory::Throttling);
    assert_eq!(errors[0].severity, Severity::Warning);
    assert_eq!(errors[0].attempts, 4);
    assert_eq!(result.task_records()[0].attempts, 4);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1"]),
            "ec2",
            move |_ctx: TaskContext<()>| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::new("ServiceUnavailable", "try later"))
                    } else {
                        Ok(Some(vec!["ok".to_string()]))
                    }
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.success_count(), 1);
    assert!(!result.errors().has_errors());
    assert_eq!(result.task_records()[0].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn unknown_errors_are_critical_and_fail_the_run() {
    let result: ExecutionResult<Vec<String>> = default_executor()
        .execute(
            &accounts(&["111", "222"]),
            &regions(&["us-east-1"]),
            "ec2",
            |_ctx: TaskContext<()>| async move { Err(ProviderError::new("Boom", "exploded")) },
        )
        .await
        .unwrap();

    assert_eq!(result.errors().critical_errors().len(), 2);
    assert!(result.is_failed_run());
    let report = result.error_report(1);
    assert!(report.contains("2 of 2 tasks failed"), "{report}");
    assert!(report.contains("... and 1 more"), "{report}");
}

#[tokio::test(start_paused = true)]
async fn partial_success_is_not_a_failed_run() {
    let result = default_executor()
        .execute(
            &accounts(&["111", "222"]),
            &regions(&["us-east-1"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                if ctx.account_id() == "222" {
                    Err(ProviderError::new("Boom", "exploded"))
                } else {
                    Ok(Some(vec![ctx.account_id().to_string()]))
                }
            },
        )
        .await
        .unwrap();

    assert!(result.has_any_success());
    assert!(result.has_any_failure());
    assert!(!result.is_failed_run());
    assert_eq!(result.flat_data(), vec!["111"]);
    assert_eq!(result.data()[1], None);
}

#[tokio::test(start_paused = true)]
async fn panicking_task_is_isolated() {
    let result = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1", "eu-west-1", "ap-south-1"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                if ctx.region() == "eu-west-1" {
                    panic!("callback blew up");
                }
                Ok(Some(vec![ctx.region().to_string()]))
            },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count(), 2);
    assert_eq!(result.flat_data(), vec!["us-east-1", "ap-south-1"]);
    let errors = result.errors().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, "TaskPanicked");
    assert_eq!(errors[0].region, "eu-west-1");
    assert_eq!(errors[0].category, ErrorCategory::Unknown);
    assert_eq!(errors[0].severity, Severity::Critical);
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_time_out() {
    let exec = executor(ExecutionConfig {
        per_task_timeout: Some(Duration::from_millis(50)),
        retry: RetryConfig {
            max_retries: 1,
            ..quick_retry()
        },
        ..ExecutionConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result: ExecutionResult<Vec<String>> = exec
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1"]),
            "ec2",
            move |_ctx: TaskContext<()>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Some(Vec::new()))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let errors = result.errors().errors();
    assert_eq!(errors[0].code, "RequestTimeout");
    assert_eq!(errors[0].category, ErrorCategory::Timeout);
    assert!(result.total_duration() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn worker_pool_bounds_concurrency() {
    let exec = executor(ExecutionConfig {
        max_workers: 3,
        ..ExecutionConfig::default()
    });
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (active, highest) = (in_flight.clone(), peak.clone());

    let result = exec
        .execute(
            &accounts(&["1", "2", "3", "4"]),
            &regions(&["us-east-1", "us-west-2", "eu-west-1"]),
            "ec2",
            move |_ctx: TaskContext<()>| {
                let (active, highest) = (active.clone(), highest.clone());
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    highest.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(Some(vec![()]))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_rate_limit_delays_every_attempt() {
    let limiters = RateLimiterRegistry::new()
        .with_override("ec2", RateLimitConfig::new(1.0, 1))
        .unwrap();
    let executor = Executor::new(
        ExecutionConfig {
            retry: RetryConfig {
                jitter: Jitter::None,
                ..quick_retry()
            },
            ..ExecutionConfig::default()
        },
        Arc::new(StaticSessionProvider::new(())),
        Arc::new(limiters),
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let started = tokio::time::Instant::now();
    let result = executor
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1", "us-west-2", "eu-west-1"]),
            "ec2",
            move |ctx: TaskContext<()>| {
                let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    if first {
                        return Err(ProviderError::new("Throttling", "Rate exceeded"));
                    }
                    Ok(Some(vec![ctx.region().to_string()]))
                }
            },
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // burst of one, then one token per second for the remaining three attempts
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3500), "elapsed {elapsed:?}");
    assert_eq!(result.success_count(), 3);
    assert_eq!(result.error_count(), 0);
    assert_eq!(result.flat_data().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn empty_inputs_are_rejected() {
    let exec = default_executor();
    let cb = |_ctx: TaskContext<()>| async move { Ok::<_, ProviderError>(Some(vec![1u8])) };
    assert!(matches!(
        exec.execute(&[], &regions(&["us-east-1"]), "ec2", cb).await,
        Err(ExecutionError::NoAccounts)
    ));
    assert!(matches!(
        exec.execute(&accounts(&["1"]), &[], "ec2", cb).await,
        Err(ExecutionError::NoRegions)
    ));
}

#[test]
fn zero_workers_is_a_config_error() {
    let built = Executor::new(
        ExecutionConfig {
            max_workers: 0,
            ..ExecutionConfig::default()
        },
        Arc::new(StaticSessionProvider::new(())),
        Arc::new(RateLimiterRegistry::new()),
    );
    assert!(built.is_err());
}

#[tokio::test(start_paused = true)]
async fn progress_tracker_sees_every_task() {
    let tracker = Arc::new(CountingTracker::new());
    let exec = default_executor().with_progress(tracker.clone());
    exec.execute(
        &accounts(&["111", "222"]),
        &regions(&["us-east-1", "eu-west-1"]),
        "ec2",
        |ctx: TaskContext<()>| async move {
            if ctx.region() == "eu-west-1" {
                Err(ProviderError::new("NoSuchEntity", "gone"))
            } else {
                Ok(Some(vec![1]))
            }
        },
    )
    .await
    .unwrap();

    assert_eq!(tracker.stats(), (2, 2, 4));
    assert_eq!(tracker.started(), 4);
}

struct PerAccountSessions {
    denied: &'static str,
    issued: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl SessionProvider for PerAccountSessions {
    type Session = String;

    async fn session(&self, account: &Account, region: &str) -> Result<String, ProviderError> {
        if account.id == self.denied {
            return Err(ProviderError::new("AccessDenied", "cannot assume role")
                .with_operation("AssumeRole"));
        }
        *self.issued.lock().unwrap().entry(account.id.clone()).or_default() += 1;
        Ok(format!("session-{}-{region}", account.id))
    }
}

#[tokio::test(start_paused = true)]
async fn session_failures_skip_the_callback() {
    let provider = Arc::new(PerAccountSessions {
        denied: "222",
        issued: Mutex::new(HashMap::new()),
    });
    let exec = Executor::new(
        ExecutionConfig::default(),
        provider.clone(),
        Arc::new(RateLimiterRegistry::new()),
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result = exec
        .execute(
            &accounts(&["111", "222"]),
            &regions(&["us-east-1"]),
            "iam",
            move |ctx: TaskContext<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(vec![ctx.session().clone()]))
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.flat_data(), vec!["session-111-us-east-1"]);
    let errors = result.errors().errors();
    assert_eq!(errors[0].account_id, "222");
    assert_eq!(errors[0].operation, "AssumeRole");
    assert_eq!(errors[0].attempts, 0);
    assert_eq!(errors[0].severity, Severity::Info);
    assert_eq!(provider.issued.lock().unwrap().get("111"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn result_json_lists_tasks_and_errors() {
    let result = default_executor()
        .execute(
            &accounts(&["111"]),
            &regions(&["us-east-1", "eu-west-1"]),
            "ec2",
            |ctx: TaskContext<()>| async move {
                if ctx.region() == "eu-west-1" {
                    Err(ProviderError::new("InvalidParameterValue", "bad filter"))
                } else {
                    Ok(Some(vec![1]))
                }
            },
        )
        .await
        .unwrap();

    let json = result.to_json();
    assert_eq!(json["service"], "ec2");
    assert_eq!(json["total"], 2);
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["tasks"][1]["region"], "eu-west-1");
    assert_eq!(json["tasks"][1]["succeeded"], false);
    assert_eq!(json["errors"][0]["category"], "InvalidRequest");
    assert_eq!(json["errors"][0]["severity"], "warning");
}

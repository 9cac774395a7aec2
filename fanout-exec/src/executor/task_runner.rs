use std::future::Future;
use std::sync::Arc;

use fanout_core::{classify_error, ErrorCategory, ErrorCollector, ProviderError, Severity, Task, TaskError};
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;
use uuid::Uuid;

use crate::executor::events::{Event, EventSink};
use crate::executor::progress::ProgressTracker;
use crate::executor::result::{TaskRecord, TaskStatus};
use crate::executor::session::{SessionProvider, TaskContext};
use crate::executor::types::ExecutionConfig;
use crate::ratelimit::TokenBucket;
use crate::retry::{decide_retry, RetryDecision};

/// State shared by every task of one run.
pub(crate) struct RunDeps<P, F> {
    pub run_id: Uuid,
    pub service: String,
    pub config: ExecutionConfig,
    pub provider: Arc<P>,
    pub limiter: Arc<TokenBucket>,
    pub errors: Arc<ErrorCollector>,
    pub event_sink: Arc<dyn EventSink>,
    pub progress: Option<Arc<dyn ProgressTracker>>,
    pub callback: F,
}

impl<P, F> RunDeps<P, F> {
    async fn emit(&self, event: Event) {
        self.event_sink.emit(event).await;
    }

    /// Classify, record and announce a terminal failure.
    pub(crate) async fn fail(&self, task: &Task, error: &ProviderError, attempts: usize) -> TaskError {
        let classification = classify_error(error);
        let severity = match classification.category {
            ErrorCategory::Unknown => Severity::Critical,
            _ => self.config.default_severity,
        };
        let operation = error.operation.as_deref().unwrap_or(self.service.as_str());
        let recorded = self.errors.record(
            TaskError::from_provider(
                error,
                task.account_id(),
                task.account_name(),
                task.region.as_str(),
                self.service.as_str(),
                operation,
                severity,
            )
            .with_attempts(attempts),
        );

        self.emit(Event::TaskFailed {
            run_id: self.run_id,
            task_index: task.index,
            error: recorded.clone(),
        })
        .await;
        if let Some(p) = &self.progress {
            p.on_task_failure();
        }
        recorded
    }
}

enum Attempted<T> {
    Succeeded { data: Option<T>, attempts: usize },
    Failed { error: ProviderError, attempts: usize },
}

pub(crate) async fn run_task<P, T, F, Fut>(
    task: Arc<Task>,
    deps: Arc<RunDeps<P, F>>,
    _permit: OwnedSemaphorePermit,
) -> TaskRecord<T>
where
    P: SessionProvider,
    F: Fn(TaskContext<P::Session>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, ProviderError>> + Send,
{
    let started = Instant::now();
    deps.emit(Event::TaskStarted {
        run_id: deps.run_id,
        task_index: task.index,
        account_id: task.account_id().to_string(),
        region: task.region.clone(),
    })
    .await;
    if let Some(p) = &deps.progress {
        p.on_task_start();
    }

    let (status, data, attempts) = match attempt_task(&task, &deps).await {
        Attempted::Succeeded { data, attempts } => {
            deps.emit(Event::TaskSucceeded {
                run_id: deps.run_id,
                task_index: task.index,
                attempts,
                has_data: data.is_some(),
            })
            .await;
            if let Some(p) = &deps.progress {
                p.on_task_success();
            }
            (TaskStatus::Succeeded, data, attempts)
        }
        Attempted::Failed { error, attempts } => {
            deps.fail(&task, &error, attempts).await;
            (TaskStatus::Failed, None, attempts)
        }
    };

    TaskRecord {
        task: (*task).clone(),
        status,
        data,
        attempts,
        duration: started.elapsed(),
    }
}

async fn attempt_task<P, T, F, Fut>(task: &Arc<Task>, deps: &RunDeps<P, F>) -> Attempted<T>
where
    P: SessionProvider,
    F: Fn(TaskContext<P::Session>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, ProviderError>> + Send,
{
    let session = match deps.provider.session(&task.account, &task.region).await {
        Ok(s) => Arc::new(s),
        Err(error) => {
            tracing::debug!(task = %task, code = %error.code, "session unavailable");
            return Attempted::Failed { error, attempts: 0 };
        }
    };
    let ctx = TaskContext::new(session, task.clone());

    let mut attempt_no = 0;
    loop {
        attempt_no += 1;
        deps.limiter.acquire().await;
        deps.emit(Event::AttemptStarted {
            run_id: deps.run_id,
            task_index: task.index,
            attempt_no,
        })
        .await;

        let outcome = match deps.config.per_task_timeout {
            Some(limit) => tokio::time::timeout(limit, (deps.callback)(ctx.clone()))
                .await
                .unwrap_or_else(|_| Err(ProviderError::timeout(limit))),
            None => (deps.callback)(ctx.clone()).await,
        };

        deps.emit(Event::AttemptFinished {
            run_id: deps.run_id,
            task_index: task.index,
            attempt_no,
            succeeded: outcome.is_ok(),
        })
        .await;

        let error = match outcome {
            Ok(data) => {
                return Attempted::Succeeded {
                    data,
                    attempts: attempt_no,
                }
            }
            Err(e) => e,
        };

        let category = classify_error(&error).category;
        match decide_retry(
            &deps.config.retry,
            attempt_no,
            category,
            error.retry_after,
            || fastrand::u64(..),
        ) {
            RetryDecision::RetryAfter { delay, reason } => {
                tracing::debug!(
                    task = %task,
                    attempt_no,
                    code = %error.code,
                    delay_ms = delay.as_millis() as u64,
                    ?reason,
                    "retrying task"
                );
                deps.emit(Event::RetryScheduled {
                    run_id: deps.run_id,
                    task_index: task.index,
                    attempt_no,
                    category,
                    delay_ms: delay.as_millis() as u64,
                })
                .await;
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Stop { .. } => {
                return Attempted::Failed {
                    error,
                    attempts: attempt_no,
                };
            }
        }
    }
}

use std::future::Future;
use std::sync::Arc;

use fanout_core::{build_tasks, Account, ErrorCollector, ProviderError, Task};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::executor::events::{Event, EventSink, NoOpEventSink};
use crate::executor::progress::ProgressTracker;
use crate::executor::result::{ExecutionError, ExecutionResult, TaskRecord, TaskStatus};
use crate::executor::session::{SessionProvider, TaskContext};
use crate::executor::task_runner::{run_task, RunDeps};
use crate::executor::types::ExecutionConfig;
use crate::ratelimit::RateLimiterRegistry;

/// Runs one callback across every account × region pair.
pub struct Executor<P> {
    config: ExecutionConfig,
    provider: Arc<P>,
    limiters: Arc<RateLimiterRegistry>,
    event_sink: Arc<dyn EventSink>,
    progress: Option<Arc<dyn ProgressTracker>>,
}

impl<P> Executor<P>
where
    P: SessionProvider,
{
    pub fn new(
        config: ExecutionConfig,
        provider: Arc<P>,
        limiters: Arc<RateLimiterRegistry>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config: config.normalized()?,
            provider,
            limiters,
            event_sink: Arc::new(NoOpEventSink),
            progress: None,
        })
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Invoke `callback` once per task (plus retries) with at most `max_workers` tasks in
    /// flight, then collect results in task order.
    ///
    /// Individual task failures never fail the call; they end up in the result's error
    /// collector. Only an empty account or region list is an error.
    pub async fn execute<T, F, Fut>(
        &self,
        accounts: &[Account],
        regions: &[String],
        service: &str,
        callback: F,
    ) -> Result<ExecutionResult<T>, ExecutionError>
    where
        T: Send + 'static,
        F: Fn(TaskContext<P::Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, ProviderError>> + Send + 'static,
    {
        if accounts.is_empty() {
            return Err(ExecutionError::NoAccounts);
        }
        if regions.is_empty() {
            return Err(ExecutionError::NoRegions);
        }

        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let tasks = build_tasks(accounts, regions);
        let errors = Arc::new(ErrorCollector::new(service));

        tracing::info!(
            %run_id,
            service,
            accounts = accounts.len(),
            regions = regions.len(),
            tasks = tasks.len(),
            max_workers = self.config.max_workers,
            "starting parallel run"
        );
        if let Some(p) = &self.progress {
            p.set_total(tasks.len());
        }
        self.event_sink
            .emit(Event::RunStarted {
                run_id,
                service: service.to_string(),
                total_tasks: tasks.len(),
                max_workers: self.config.max_workers,
            })
            .await;

        let deps = Arc::new(RunDeps {
            run_id,
            service: service.to_string(),
            config: self.config.clone(),
            provider: self.provider.clone(),
            limiter: self.limiters.get(service),
            errors: errors.clone(),
            event_sink: self.event_sink.clone(),
            progress: self.progress.clone(),
            callback,
        });

        let handles = self.spawn_tasks(&tasks, &deps).await?;
        let records = collect_results(&tasks, handles, &deps).await;
        drop(deps);

        let errors = Arc::try_unwrap(errors).unwrap_or_else(|shared| shared.snapshot());
        let result = ExecutionResult {
            run_id,
            service: service.to_string(),
            records,
            errors,
            total_duration: started.elapsed(),
        };

        tracing::info!(
            %run_id,
            service,
            succeeded = result.success_count(),
            failed = result.error_count(),
            duration_ms = result.total_duration.as_millis() as u64,
            "parallel run finished"
        );
        self.event_sink
            .emit(Event::RunFinished {
                run_id,
                succeeded: result.success_count(),
                failed: result.error_count(),
                duration_ms: result.total_duration.as_millis() as u64,
            })
            .await;

        Ok(result)
    }

    async fn spawn_tasks<T, F, Fut>(
        &self,
        tasks: &[Task],
        deps: &Arc<RunDeps<P, F>>,
    ) -> Result<Vec<JoinHandle<TaskRecord<T>>>, ExecutionError>
    where
        T: Send + 'static,
        F: Fn(TaskContext<P::Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, ProviderError>> + Send + 'static,
    {
        let pool = Arc::new(Semaphore::new(self.config.max_workers));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let permit = pool
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ExecutionError::PoolClosed)?;
            let task = Arc::new(task.clone());
            let deps = deps.clone();
            handles.push(tokio::spawn(async move { run_task(task, deps, permit).await }));
        }

        Ok(handles)
    }
}

/// Join every task, slotting each record at its task index. A panicked task is recorded
/// as an unclassified failure.
async fn collect_results<P, T, F>(
    tasks: &[Task],
    handles: Vec<JoinHandle<TaskRecord<T>>>,
    deps: &RunDeps<P, F>,
) -> Vec<TaskRecord<T>> {
    let mut slots: Vec<Option<TaskRecord<T>>> = (0..tasks.len()).map(|_| None).collect();

    for (task, handle) in tasks.iter().zip(handles) {
        let record = match handle.await {
            Ok(record) => record,
            Err(join_err) => {
                let error = ProviderError::panicked(join_err.to_string());
                let recorded = deps.fail(task, &error, 0).await;
                TaskRecord {
                    task: task.clone(),
                    status: TaskStatus::Failed,
                    data: None,
                    attempts: recorded.attempts,
                    duration: Default::default(),
                }
            }
        };
        let index = record.task.index;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(record);
        }
    }

    slots.into_iter().flatten().collect()
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fanout_core::ErrorCategory;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::executor::{Event, EventSink};

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub run_id: Option<Uuid>,
    pub service: String,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration: Option<Duration>,
    pub tasks_planned: usize,
    pub tasks_total: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub attempts: usize,
    pub failed_attempts: usize,
    pub retries: usize,
    pub failures_by_category: BTreeMap<ErrorCategory, usize>,
}

impl RunMetrics {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            started_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_run_started(&mut self, run_id: Uuid, tasks_planned: usize) {
        self.run_id = Some(run_id);
        self.tasks_planned = tasks_planned;
    }

    pub fn record_task_success(&mut self) {
        self.tasks_succeeded += 1;
        self.tasks_total += 1;
    }

    pub fn record_task_failure(&mut self, category: ErrorCategory) {
        self.tasks_failed += 1;
        self.tasks_total += 1;
        *self.failures_by_category.entry(category).or_default() += 1;
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn record_failed_attempt(&mut self) {
        self.failed_attempts += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at) {
            self.total_duration = Some(finished.duration_since(started));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let failures: BTreeMap<&str, usize> = self
            .failures_by_category
            .iter()
            .map(|(c, n)| (c.as_str(), *n))
            .collect();
        serde_json::json!({
            "run_id": self.run_id.map(|id| id.to_string()),
            "service": self.service,
            "duration_ms": self.total_duration.map(|d| d.as_millis() as u64),
            "tasks": {
                "planned": self.tasks_planned,
                "total": self.tasks_total,
                "succeeded": self.tasks_succeeded,
                "failed": self.tasks_failed,
            },
            "attempts": {
                "total": self.attempts,
                "failed": self.failed_attempts,
                "retries": self.retries,
            },
            "failures_by_category": failures,
        })
    }
}

pub struct MetricsCollector {
    metrics: Arc<Mutex<RunMetrics>>,
}

impl MetricsCollector {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            metrics: Arc::new(Mutex::new(RunMetrics::new(service))),
        }
    }

    pub async fn record_run_started(&self, run_id: Uuid, tasks_planned: usize) {
        self.metrics
            .lock()
            .await
            .record_run_started(run_id, tasks_planned);
    }

    pub async fn record_task_success(&self) {
        self.metrics.lock().await.record_task_success();
    }

    pub async fn record_task_failure(&self, category: ErrorCategory) {
        self.metrics.lock().await.record_task_failure(category);
    }

    pub async fn record_attempt(&self) {
        self.metrics.lock().await.record_attempt();
    }

    pub async fn record_failed_attempt(&self) {
        self.metrics.lock().await.record_failed_attempt();
    }

    pub async fn record_retry(&self) {
        self.metrics.lock().await.record_retry();
    }

    pub async fn finish(&self) {
        self.metrics.lock().await.finish();
    }

    pub async fn get_metrics(&self) -> RunMetrics {
        self.metrics.lock().await.clone()
    }
}

/// Updates a [`MetricsCollector`] from the event stream, then forwards to `base`.
pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl EventSink for MetricsEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::RunStarted {
                run_id,
                total_tasks,
                ..
            } => {
                self.collector
                    .record_run_started(*run_id, *total_tasks)
                    .await;
            }
            Event::TaskSucceeded { .. } => {
                self.collector.record_task_success().await;
            }
            Event::TaskFailed { error, .. } => {
                self.collector.record_task_failure(error.category).await;
            }
            Event::RetryScheduled { .. } => {
                self.collector.record_retry().await;
            }
            Event::AttemptStarted { .. } => {
                self.collector.record_attempt().await;
            }
            Event::AttemptFinished { succeeded, .. } => {
                if !succeeded {
                    self.collector.record_failed_attempt().await;
                }
            }
            Event::RunFinished { .. } => {
                self.collector.finish().await;
            }
            Event::TaskStarted { .. } => {}
        }

        self.base.emit(event).await;
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use fanout_core::{ErrorCategory, TaskError};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        service: String,
        total_tasks: usize,
        max_workers: usize,
    },
    RunFinished {
        run_id: Uuid,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
    TaskStarted {
        run_id: Uuid,
        task_index: usize,
        account_id: String,
        region: String,
    },
    TaskSucceeded {
        run_id: Uuid,
        task_index: usize,
        attempts: usize,
        has_data: bool,
    },
    TaskFailed {
        run_id: Uuid,
        task_index: usize,
        error: TaskError,
    },
    AttemptStarted {
        run_id: Uuid,
        task_index: usize,
        attempt_no: usize,
    },
    AttemptFinished {
        run_id: Uuid,
        task_index: usize,
        attempt_no: usize,
        succeeded: bool,
    },
    RetryScheduled {
        run_id: Uuid,
        task_index: usize,
        attempt_no: usize,
        category: ErrorCategory,
        delay_ms: u64,
    },
}

impl Event {
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::RunFinished { run_id, .. }
            | Event::TaskStarted { run_id, .. }
            | Event::TaskSucceeded { run_id, .. }
            | Event::TaskFailed { run_id, .. }
            | Event::AttemptStarted { run_id, .. }
            | Event::AttemptFinished { run_id, .. }
            | Event::RetryScheduled { run_id, .. } => *run_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::RunFinished { .. } => "run.finished",
            Event::TaskStarted { .. } => "task.started",
            Event::TaskSucceeded { .. } => "task.succeeded",
            Event::TaskFailed { .. } => "task.failed",
            Event::AttemptStarted { .. } => "attempt.started",
            Event::AttemptFinished { .. } => "attempt.finished",
            Event::RetryScheduled { .. } => "task.retry_scheduled",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let run_id = self.run_id().to_string();
        let kind = self.kind();
        match self {
            Event::RunStarted { service, total_tasks, max_workers, .. } => {
                json!({ "type": kind, "run_id": run_id, "service": service, "total_tasks": total_tasks, "max_workers": max_workers })
            }
            Event::RunFinished { succeeded, failed, duration_ms, .. } => {
                json!({ "type": kind, "run_id": run_id, "succeeded": succeeded, "failed": failed, "duration_ms": duration_ms })
            }
            Event::TaskStarted { task_index, account_id, region, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "account_id": account_id, "region": region })
            }
            Event::TaskSucceeded { task_index, attempts, has_data, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "attempts": attempts, "has_data": has_data })
            }
            Event::TaskFailed { task_index, error, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "error": serde_json::to_value(error).unwrap_or_default() })
            }
            Event::AttemptStarted { task_index, attempt_no, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "attempt_no": attempt_no })
            }
            Event::AttemptFinished { task_index, attempt_no, succeeded, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "attempt_no": attempt_no, "succeeded": succeeded })
            }
            Event::RetryScheduled { task_index, attempt_no, category, delay_ms, .. } => {
                json!({ "type": kind, "run_id": run_id, "task_index": task_index, "attempt_no": attempt_no, "category": category.as_str(), "delay_ms": delay_ms })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

/// Forwards events to `tracing` at debug level.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        tracing::debug!(event = event.kind(), payload = %event.to_json(), "executor event");
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

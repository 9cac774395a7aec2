use std::collections::BTreeMap;
use std::time::Duration;

use fanout_core::{ErrorCategory, ErrorCollector, Task, TaskError};
use serde_json::json;
use uuid::Uuid;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// Outcome of one account × region task.
#[derive(Debug, Clone)]
pub struct TaskRecord<T> {
    pub task: Task,
    pub status: TaskStatus,
    /// `None` for failures and for successful callbacks that returned nothing.
    pub data: Option<T>,
    pub attempts: usize,
    pub duration: Duration,
}

impl<T> TaskRecord<T> {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

/// Callback outputs that hold a list of records, so results can be flattened.
///
/// Callbacks returning one value per task skip this and use
/// [`ExecutionResult::successful_data`] for the flat list.
pub trait Records {
    type Record;

    fn records(&self) -> &[Self::Record];

    fn into_records(self) -> Vec<Self::Record>;
}

impl<R> Records for Vec<R> {
    type Record = R;

    fn records(&self) -> &[R] {
        self
    }

    fn into_records(self) -> Vec<R> {
        self
    }
}

/// Everything a run produced: one record per task in task-list order, plus the errors.
///
/// A run is never failed wholesale because some tasks failed; callers decide using
/// [`is_failed_run`](Self::is_failed_run) or the finer-grained predicates.
#[derive(Debug)]
pub struct ExecutionResult<T> {
    pub(crate) run_id: Uuid,
    pub(crate) service: String,
    pub(crate) records: Vec<TaskRecord<T>>,
    pub(crate) errors: ErrorCollector,
    pub(crate) total_duration: Duration,
}

impl<T> ExecutionResult<T> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn task_records(&self) -> &[TaskRecord<T>] {
        &self.records
    }

    /// Per-task data in task order; `None` for failed or empty tasks.
    pub fn data(&self) -> Vec<Option<&T>> {
        self.records.iter().map(|r| r.data.as_ref()).collect()
    }

    pub fn into_data(self) -> Vec<Option<T>> {
        self.records.into_iter().map(|r| r.data).collect()
    }

    /// Data of successful tasks only, in task order; the flat list for scalar outputs.
    pub fn successful_data(&self) -> Vec<&T> {
        self.records.iter().filter_map(|r| r.data.as_ref()).collect()
    }

    pub fn into_successful_data(self) -> Vec<T> {
        self.records.into_iter().filter_map(|r| r.data).collect()
    }

    /// Concatenation of every task's records, in task order.
    pub fn flat_data(&self) -> Vec<T::Record>
    where
        T: Records,
        T::Record: Clone,
    {
        self.records
            .iter()
            .filter_map(|r| r.data.as_ref())
            .flat_map(|d| d.records().iter().cloned())
            .collect()
    }

    pub fn into_flat_data(self) -> Vec<T::Record>
    where
        T: Records,
    {
        self.records
            .into_iter()
            .filter_map(|r| r.data)
            .flat_map(Records::into_records)
            .collect()
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.succeeded()).count()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn errors(&self) -> &ErrorCollector {
        &self.errors
    }

    pub fn error_summary(&self) -> String {
        self.errors.summary()
    }

    pub fn errors_by_category(&self) -> BTreeMap<ErrorCategory, Vec<TaskError>> {
        self.errors.by_category()
    }

    pub fn has_any_success(&self) -> bool {
        self.success_count() > 0
    }

    pub fn has_any_failure(&self) -> bool {
        self.error_count() > 0
    }

    /// At least one task ran and none succeeded.
    pub fn has_failures_only(&self) -> bool {
        !self.records.is_empty() && !self.has_any_success()
    }

    /// No task succeeded and at least one failure is critical.
    pub fn is_failed_run(&self) -> bool {
        !self.has_any_success() && !self.errors.critical_errors().is_empty()
    }

    /// Multi-line failure report grouped by category, listing at most
    /// `max_per_category` errors per group.
    pub fn error_report(&self, max_per_category: usize) -> String {
        let by_category = self.errors.by_category();
        if by_category.is_empty() {
            return format!("{}: all {} tasks succeeded", self.service, self.total_count());
        }

        let mut out = format!(
            "{}: {} of {} tasks failed\n",
            self.service,
            self.error_count(),
            self.total_count()
        );
        for (category, errors) in &by_category {
            out.push_str(&format!("  {category} ({}):\n", errors.len()));
            for e in errors.iter().take(max_per_category) {
                out.push_str(&format!("    - {}: {} - {}\n", e.location(), e.code, e.message));
            }
            if errors.len() > max_per_category {
                out.push_str(&format!(
                    "    ... and {} more\n",
                    errors.len() - max_per_category
                ));
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let tasks: Vec<serde_json::Value> = self
            .records
            .iter()
            .map(|r| {
                json!({
                    "index": r.task.index,
                    "account_id": r.task.account_id(),
                    "account_name": r.task.account_name(),
                    "region": r.task.region,
                    "succeeded": r.succeeded(),
                    "has_data": r.data.is_some(),
                    "attempts": r.attempts,
                    "duration_ms": r.duration.as_millis() as u64,
                })
            })
            .collect();
        json!({
            "run_id": self.run_id.to_string(),
            "service": self.service,
            "total": self.total_count(),
            "succeeded": self.success_count(),
            "failed": self.error_count(),
            "duration_ms": self.total_duration.as_millis() as u64,
            "summary": self.error_summary(),
            "tasks": tasks,
            "errors": serde_json::to_value(self.errors.errors()).unwrap_or_default(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("no accounts to run against")]
    NoAccounts,
    #[error("no regions to run against")]
    NoRegions,
    #[error("invalid execution config: {0}")]
    Config(#[from] ConfigError),
    #[error("worker pool closed unexpectedly")]
    PoolClosed,
}

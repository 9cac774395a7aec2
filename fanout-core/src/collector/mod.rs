use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::classify::{ErrorCategory, Severity};
use crate::error::ProviderError;

mod task_error;

pub use task_error::TaskError;

/// Thread-safe accumulator of classified failures for one service.
///
/// Workers append concurrently; views take a consistent snapshot under the lock.
#[derive(Debug)]
pub struct ErrorCollector {
    service: String,
    errors: Mutex<Vec<TaskError>>,
}

impl ErrorCollector {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Classify `error` and record it.
    ///
    /// `AccessDenied` is always recorded as `Info`, whatever `severity` says.
    pub fn collect(
        &self,
        error: &ProviderError,
        account_id: &str,
        account_name: &str,
        region: &str,
        operation: &str,
        severity: Severity,
    ) -> TaskError {
        let task_error = TaskError::from_provider(
            error,
            account_id,
            account_name,
            region,
            self.service.as_str(),
            operation,
            severity,
        );
        self.record(task_error)
    }

    /// Record an already-built error, applying the same downgrade rule as [`collect`](Self::collect).
    pub fn record(&self, mut error: TaskError) -> TaskError {
        if error.category == ErrorCategory::AccessDenied {
            error.severity = Severity::Info;
        }

        match error.severity {
            Severity::Critical => tracing::error!(service = %self.service, "{error}"),
            Severity::Warning => tracing::warn!(service = %self.service, "{error}"),
            Severity::Info => tracing::info!(service = %self.service, "{error}"),
            Severity::Debug => tracing::debug!(service = %self.service, "{error}"),
        }

        self.errors.lock().push(error.clone());
        error
    }

    /// Unwrap a secondary call, or record its error and fall back to `default`.
    ///
    /// For lookups such as tags where a failure should not fail the task. Callers
    /// usually pass `Severity::Debug`.
    #[allow(clippy::too_many_arguments)]
    pub fn try_or_default<T>(
        &self,
        result: Result<T, ProviderError>,
        default: T,
        account_id: &str,
        account_name: &str,
        region: &str,
        operation: &str,
        severity: Severity,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                self.collect(&error, account_id, account_name, region, operation, severity);
                default
            }
        }
    }

    pub fn errors(&self) -> Vec<TaskError> {
        self.errors.lock().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<TaskError> {
        self.errors
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }

    pub fn critical_errors(&self) -> Vec<TaskError> {
        self.with_severity(Severity::Critical)
    }

    pub fn warning_errors(&self) -> Vec<TaskError> {
        self.with_severity(Severity::Warning)
    }

    pub fn info_errors(&self) -> Vec<TaskError> {
        self.with_severity(Severity::Info)
    }

    /// Errors grouped by account id.
    pub fn by_account(&self) -> BTreeMap<String, Vec<TaskError>> {
        let mut out: BTreeMap<String, Vec<TaskError>> = BTreeMap::new();
        for e in self.errors.lock().iter() {
            out.entry(e.account_id.clone()).or_default().push(e.clone());
        }
        out
    }

    pub fn by_category(&self) -> BTreeMap<ErrorCategory, Vec<TaskError>> {
        let mut out: BTreeMap<ErrorCategory, Vec<TaskError>> = BTreeMap::new();
        for e in self.errors.lock().iter() {
            out.entry(e.category).or_default().push(e.clone());
        }
        out
    }

    /// Short digest, e.g. `3 errors (warning: 2, info: 1) across 2 accounts, primarily Throttling`.
    pub fn summary(&self) -> String {
        let errors = self.errors.lock();
        if errors.is_empty() {
            return "no errors".to_string();
        }

        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
        let mut accounts: Vec<&str> = Vec::new();
        for e in errors.iter() {
            *by_severity.entry(e.severity).or_default() += 1;
            *by_category.entry(e.category).or_default() += 1;
            if !accounts.contains(&e.account_id.as_str()) {
                accounts.push(&e.account_id);
            }
        }

        let parts: Vec<String> = by_severity
            .iter()
            .map(|(severity, n)| format!("{severity}: {n}"))
            .collect();

        // Ties go to the category declared first.
        let primary = by_category
            .iter()
            .fold(None::<(ErrorCategory, usize)>, |best, (c, n)| match best {
                Some((_, best_n)) if best_n >= *n => best,
                _ => Some((*c, *n)),
            })
            .map(|(c, _)| c);

        let mut out = format!(
            "{} ({}) across {}",
            plural(errors.len(), "error"),
            parts.join(", "),
            plural(accounts.len(), "account")
        );
        if let Some(primary) = primary {
            out.push_str(&format!(", primarily {primary}"));
        }
        out
    }

    pub fn clear(&self) {
        self.errors.lock().clear();
    }

    /// An independent copy holding the errors recorded so far.
    pub fn snapshot(&self) -> ErrorCollector {
        ErrorCollector {
            service: self.service.clone(),
            errors: Mutex::new(self.errors()),
        }
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Record `error` when a collector is present; otherwise only log it.
#[allow(clippy::too_many_arguments)]
pub fn safe_collect(
    collector: Option<&ErrorCollector>,
    error: &ProviderError,
    account_id: &str,
    account_name: &str,
    region: &str,
    operation: &str,
    severity: Severity,
) -> Option<TaskError> {
    match collector {
        Some(c) => Some(c.collect(error, account_id, account_name, region, operation, severity)),
        None => {
            tracing::warn!("[{account_name}/{region}] {operation}: {} - {}", error.code, error.message);
            None
        }
    }
}

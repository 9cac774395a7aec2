use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{classify_error, ErrorCategory, Severity};
use crate::error::ProviderError;

/// A classified failure recorded against one account/region/operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskError {
    pub occurred_at: DateTime<Utc>,
    pub account_id: String,
    pub account_name: String,
    pub region: String,
    pub service: String,
    pub operation: String,
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    pub severity: Severity,
    /// Callback invocations made before giving up; 0 when the task never reached the callback.
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl TaskError {
    pub fn from_provider(
        error: &ProviderError,
        account_id: impl Into<String>,
        account_name: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
        operation: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            occurred_at: Utc::now(),
            account_id: account_id.into(),
            account_name: account_name.into(),
            region: region.into(),
            service: service.into(),
            operation: operation.into(),
            code: error.code.clone(),
            message: error.message.clone(),
            category: classify_error(error).category,
            severity,
            attempts: 0,
            resource_id: None,
        }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// The resource the failed call was about, e.g. an instance or bucket.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn location(&self) -> String {
        format!("{}/{}", self.account_name, self.region)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} - {}.{}: {}",
            self.severity.as_str().to_ascii_uppercase(),
            self.location(),
            self.service,
            self.operation,
            self.code
        )
    }
}

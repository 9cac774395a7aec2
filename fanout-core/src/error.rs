use std::time::Duration;

/// A raw failure reported by a provider API call or session factory.
///
/// Callers translate their SDK errors into this shape; the classifier only looks at
/// `code` and `message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
    /// API operation that failed, e.g. `DescribeVolumes`.
    pub operation: Option<String>,
    /// Provider-supplied hint for how long to back off.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            operation: None,
            retry_after: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            "RequestTimeout",
            format!("attempt exceeded {}ms", limit.as_millis()),
        )
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new("TaskPanicked", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_code_and_message() {
        let e = ProviderError::new("AccessDenied", "not allowed");
        assert_eq!(e.to_string(), "AccessDenied: not allowed");
    }

    #[test]
    fn timeout_error_mentions_limit() {
        let e = ProviderError::timeout(Duration::from_millis(1500));
        assert_eq!(e.code, "RequestTimeout");
        assert!(e.message.contains("1500ms"));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

mod rules;

use rules::RULES;

/// Closed classification of a failure's root cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    AccessDenied,
    NotFound,
    Throttling,
    Timeout,
    InvalidRequest,
    ServiceError,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 7] = [
        ErrorCategory::AccessDenied,
        ErrorCategory::NotFound,
        ErrorCategory::Throttling,
        ErrorCategory::Timeout,
        ErrorCategory::InvalidRequest,
        ErrorCategory::ServiceError,
        ErrorCategory::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::AccessDenied => "AccessDenied",
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::Throttling => "Throttling",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::InvalidRequest => "InvalidRequest",
            ErrorCategory::ServiceError => "ServiceError",
            ErrorCategory::Unknown => "Unknown",
        }
    }

    /// Categories worth retrying locally: the same call may succeed a moment later.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorCategory::Throttling | ErrorCategory::Timeout | ErrorCategory::ServiceError
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing urgency of a recorded error. Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Warning,
        Severity::Info,
        Severity::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: ErrorCategory,
    pub severity: Severity,
}

impl Classification {
    pub const UNKNOWN: Classification = Classification {
        category: ErrorCategory::Unknown,
        severity: Severity::Critical,
    };

    pub fn is_transient(&self) -> bool {
        self.category.is_transient()
    }
}

/// Map a raw provider error code and message to a category and suggested severity.
///
/// Rules are checked in order against the normalised code first, then against the
/// normalised message. Nothing matching falls back to `Unknown`/`Critical`.
pub fn classify(code: &str, message: &str) -> Classification {
    match_rules(&normalize(code))
        .or_else(|| match_rules(&normalize(message)))
        .unwrap_or(Classification::UNKNOWN)
}

pub fn classify_error(error: &ProviderError) -> Classification {
    classify(&error.code, &error.message)
}

fn match_rules(text: &str) -> Option<Classification> {
    if text.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| text.contains(p)))
        .map(|rule| Classification {
            category: rule.category,
            severity: rule.severity,
        })
}

/// Lowercase and drop everything but ASCII letters and digits, so `Rate exceeded`,
/// `RateExceeded` and `rate_exceeded` all read `rateexceeded`.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize("Rate exceeded"), "rateexceeded");
        assert_eq!(normalize("Request_Time-out"), "requesttimeout");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn transient_categories() {
        let transient: Vec<ErrorCategory> = ErrorCategory::ALL
            .into_iter()
            .filter(|c| c.is_transient())
            .collect();
        assert_eq!(
            transient,
            vec![
                ErrorCategory::Throttling,
                ErrorCategory::Timeout,
                ErrorCategory::ServiceError
            ]
        );
    }
}

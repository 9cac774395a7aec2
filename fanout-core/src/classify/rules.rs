use super::{ErrorCategory, Severity};

pub(super) struct Rule {
    pub(super) patterns: &'static [&'static str],
    pub(super) category: ErrorCategory,
    pub(super) severity: Severity,
}

// Order matters: the first rule with a matching pattern wins. Patterns are matched
// against normalised text (lowercase, alphanumerics only).
pub(super) const RULES: &[Rule] = &[
    Rule {
        patterns: &[
            "throttl",
            "ratelimit",
            "rateexceeded",
            "toomanyrequests",
            "requestlimitexceeded",
            "slowdown",
            "provisionedthroughputexceeded",
        ],
        category: ErrorCategory::Throttling,
        severity: Severity::Warning,
    },
    Rule {
        patterns: &[
            "accessdenied",
            "unauthorized",
            "forbidden",
            "authfailure",
            "invalidclienttokenid",
            "expiredtoken",
            "signaturedoesnotmatch",
            "optinrequired",
        ],
        category: ErrorCategory::AccessDenied,
        severity: Severity::Info,
    },
    Rule {
        patterns: &["notfound", "nosuch", "doesnotexist"],
        category: ErrorCategory::NotFound,
        severity: Severity::Warning,
    },
    Rule {
        patterns: &["timeout", "timedout"],
        category: ErrorCategory::Timeout,
        severity: Severity::Warning,
    },
    Rule {
        patterns: &["invalid", "validation", "malformed", "missingparameter"],
        category: ErrorCategory::InvalidRequest,
        severity: Severity::Warning,
    },
    Rule {
        patterns: &[
            "internal",
            "serviceunavailable",
            "serviceerror",
            "serviceexception",
            "connection",
        ],
        category: ErrorCategory::ServiceError,
        severity: Severity::Warning,
    },
];

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuotaStatus {
    Ok,
    Warning,
    Critical,
    Exceeded,
    /// Usage could not be determined.
    Unknown,
}

impl QuotaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotaStatus::Ok => "OK",
            QuotaStatus::Warning => "WARNING",
            QuotaStatus::Critical => "CRITICAL",
            QuotaStatus::Exceeded => "EXCEEDED",
            QuotaStatus::Unknown => "UNKNOWN",
        }
    }

    /// WARNING, CRITICAL or EXCEEDED.
    pub fn is_high(self) -> bool {
        matches!(
            self,
            QuotaStatus::Warning | QuotaStatus::Critical | QuotaStatus::Exceeded
        )
    }
}

/// Usage percentages at which a quota changes status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaThresholds {
    pub warning: f64,
    pub critical: f64,
    pub exceeded: f64,
}

impl Default for QuotaThresholds {
    fn default() -> Self {
        Self {
            warning: 80.0,
            critical: 95.0,
            exceeded: 100.0,
        }
    }
}

/// Thresholds that would misreport status, e.g. WARNING set above CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error(
    "quota thresholds must satisfy 0 < warning <= critical <= exceeded, got {warning}/{critical}/{exceeded}"
)]
pub struct InvalidThresholds {
    pub warning: f64,
    pub critical: f64,
    pub exceeded: f64,
}

impl QuotaThresholds {
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        let Self {
            warning,
            critical,
            exceeded,
        } = *self;
        let finite = warning.is_finite() && critical.is_finite() && exceeded.is_finite();
        if finite && warning > 0.0 && warning <= critical && critical <= exceeded {
            Ok(())
        } else {
            Err(InvalidThresholds {
                warning,
                critical,
                exceeded,
            })
        }
    }

    pub fn status_for(&self, usage_percent: Option<f64>) -> QuotaStatus {
        match usage_percent {
            None => QuotaStatus::Unknown,
            Some(p) if p >= self.exceeded => QuotaStatus::Exceeded,
            Some(p) if p >= self.critical => QuotaStatus::Critical,
            Some(p) if p >= self.warning => QuotaStatus::Warning,
            Some(_) => QuotaStatus::Ok,
        }
    }
}

/// Raw `(limit, usage)` record as returned by a quota source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub service_name: String,
    pub quota_name: String,
    #[serde(default)]
    pub quota_code: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub adjustable: bool,
    pub limit: f64,
    #[serde(default)]
    pub current_usage: Option<f64>,
}

impl QuotaUsage {
    pub fn new(
        service_name: impl Into<String>,
        quota_name: impl Into<String>,
        limit: f64,
        current_usage: Option<f64>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            quota_name: quota_name.into(),
            quota_code: String::new(),
            unit: None,
            adjustable: false,
            limit,
            current_usage,
        }
    }

    pub fn usage_percent(&self) -> Option<f64> {
        let usage = self.current_usage?;
        if self.limit <= 0.0 {
            return None;
        }
        Some(usage / self.limit * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub service_name: String,
    pub quota_name: String,
    pub quota_code: String,
    pub unit: Option<String>,
    pub adjustable: bool,
    pub limit: f64,
    pub current_usage: Option<f64>,
    pub usage_percent: Option<f64>,
    pub status: QuotaStatus,
    pub fetched_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    pub fn from_usage(usage: QuotaUsage, thresholds: &QuotaThresholds) -> Self {
        let usage_percent = usage.usage_percent();
        Self {
            status: thresholds.status_for(usage_percent),
            usage_percent,
            service_name: usage.service_name,
            quota_name: usage.quota_name,
            quota_code: usage.quota_code,
            unit: usage.unit,
            adjustable: usage.adjustable,
            limit: usage.limit,
            current_usage: usage.current_usage,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_percent_requires_usage_and_positive_limit() {
        assert_eq!(QuotaUsage::new("ec2", "q", 100.0, None).usage_percent(), None);
        assert_eq!(QuotaUsage::new("ec2", "q", 0.0, Some(3.0)).usage_percent(), None);
        assert_eq!(
            QuotaUsage::new("ec2", "q", 200.0, Some(50.0)).usage_percent(),
            Some(25.0)
        );
    }
}

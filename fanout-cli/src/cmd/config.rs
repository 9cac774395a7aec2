use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use fanout_core::{Account, QuotaThresholds};
use fanout_exec::executor::ExecutionConfig;
use fanout_exec::ratelimit::{RateLimitConfig, RateLimiterRegistry};
use fanout_exec::retry::{Jitter, RetryConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{RateLimitArgs, RetryArgs, WorkerArgs};

/// On-disk configuration. Every field is optional; CLI flags win over it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub execution: ExecutionSection,
    pub rate_limits: BTreeMap<String, RateLimitConfig>,
    pub quota: QuotaSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSection {
    pub max_workers: Option<usize>,
    pub task_timeout_ms: Option<u64>,
    pub retry: RetrySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<usize>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub factor: Option<f64>,
    pub jitter: Option<Jitter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuotaSection {
    pub thresholds: Option<QuotaThresholds>,
}

/// Parse a JSON document, falling back to YAML.
pub fn parse_json_or_yaml<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    match serde_json::from_str(content) {
        Ok(v) => Ok(v),
        Err(json_err) => serde_yaml::from_str(content)
            .map_err(|yaml_err| format!("neither valid JSON ({json_err}) nor YAML ({yaml_err})")),
    }
}

pub fn read_json_or_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    parse_json_or_yaml(&content).map_err(|e| format!("{}: {e}", path.display()))
}

pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, String> {
    let Some(p) = path else {
        return Ok(FileConfig::default());
    };
    let file: FileConfig = read_json_or_yaml(p)?;
    file.validate().map_err(|e| format!("{}: {e}", p.display()))?;
    Ok(file)
}

impl FileConfig {
    /// Checks that serde cannot express; worker and rate values are checked when the engine is built.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(thresholds) = &self.quota.thresholds {
            thresholds.validate().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

pub fn parse_jitter(s: &str) -> Result<Jitter, String> {
    match s.to_ascii_lowercase().as_str() {
        "full" => Ok(Jitter::Full),
        "none" => Ok(Jitter::None),
        other => Err(format!("unknown jitter mode {other:?} (expected full or none)")),
    }
}

pub fn build_execution_config(
    file: &FileConfig,
    workers: &WorkerArgs,
    retry: &RetryArgs,
) -> Result<ExecutionConfig, String> {
    let defaults = RetryConfig::default();
    let section = &file.execution.retry;

    let jitter = match &retry.retry_jitter {
        Some(s) => parse_jitter(s)?,
        None => section.jitter.unwrap_or(defaults.jitter),
    };
    let ms = |flag: Option<u64>, from_file: Option<u64>| flag.or(from_file).map(Duration::from_millis);

    let retry = RetryConfig {
        max_retries: retry
            .retry_max
            .or(section.max_retries)
            .unwrap_or(defaults.max_retries),
        base_delay: ms(retry.retry_base_delay_ms, section.base_delay_ms)
            .unwrap_or(defaults.base_delay),
        max_delay: ms(retry.retry_max_delay_ms, section.max_delay_ms)
            .unwrap_or(defaults.max_delay),
        factor: section.factor.unwrap_or(defaults.factor),
        jitter,
    };

    let config = ExecutionConfig {
        max_workers: workers
            .max_workers
            .or(file.execution.max_workers)
            .unwrap_or(ExecutionConfig::default().max_workers),
        per_task_timeout: ms(workers.task_timeout_ms, file.execution.task_timeout_ms),
        retry,
        ..ExecutionConfig::default()
    };
    config.normalized().map_err(|e| e.to_string())
}

/// `SERVICE=RPS[:BURST]`; burst defaults to twice the rate.
pub fn parse_rate_limit(s: &str) -> Result<(String, RateLimitConfig), String> {
    let (service, limit) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid rate limit {s:?}, expected SERVICE=RPS[:BURST]"))?;
    let (rps, burst) = match limit.split_once(':') {
        Some((rps, burst)) => (rps, Some(burst)),
        None => (limit, None),
    };
    let rps: f64 = rps
        .parse()
        .map_err(|_| format!("invalid requests per second in {s:?}"))?;
    let burst: u32 = match burst {
        Some(b) => b.parse().map_err(|_| format!("invalid burst size in {s:?}"))?,
        None => (rps * 2.0).ceil().max(1.0) as u32,
    };
    Ok((service.to_string(), RateLimitConfig::new(rps, burst)))
}

pub fn build_registry(file: &FileConfig, rate: &RateLimitArgs) -> Result<RateLimiterRegistry, String> {
    let mut overrides = file.rate_limits.clone();
    for s in &rate.rate_limits {
        let (service, cfg) = parse_rate_limit(s)?;
        overrides.insert(service, cfg);
    }

    let mut registry = RateLimiterRegistry::new();
    for (service, cfg) in overrides {
        registry = registry
            .with_override(service, cfg)
            .map_err(|e| e.to_string())?;
    }
    Ok(registry)
}

pub fn build_thresholds(file: &FileConfig) -> QuotaThresholds {
    file.quota.thresholds.unwrap_or_default()
}

/// `ID` or `ID=NAME`; a bare id doubles as the display name.
pub fn parse_account(s: &str) -> Result<Account, String> {
    let account = match s.split_once('=') {
        Some((id, name)) => Account::new(id.trim(), name.trim()),
        None => Account::from_profile(s.trim()),
    };
    if account.id.is_empty() {
        return Err(format!("invalid account {s:?}"));
    }
    Ok(account)
}

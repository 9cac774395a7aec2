use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fanout_core::{build_tasks, Account, ProviderError, TaskError};
use fanout_exec::executor::{
    EventSink, Executor, MetricsCollector, MetricsEventSink, StaticSessionProvider,
    StdoutEventSink, TaskContext, TracingEventSink,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::cmd::config::{
    build_execution_config, build_registry, load_file_config, parse_account, read_json_or_yaml,
};
use crate::cmd::progress::TerminalProgress;
use crate::exit_codes;
use crate::output::{print_error, print_result, print_warning};
use crate::{ConfigArgs, OutputArgs, RateLimitArgs, RetryArgs, WorkerArgs};

/// Scripted run: which accounts and regions to fan out over, and how each cell behaves.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_service")]
    pub service: String,
    /// `{ id, name }` maps or `ID[=NAME]` strings, as accepted by `--account`.
    #[serde(deserialize_with = "deserialize_accounts")]
    pub accounts: Vec<Account>,
    pub regions: Vec<String>,
    /// Behaviour of cells without an override.
    #[serde(default)]
    pub default: CellScript,
    #[serde(default)]
    pub cells: Vec<CellOverride>,
}

fn default_service() -> String {
    "default".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccountEntry {
    Full(Account),
    Short(String),
    /// Unquoted numeric ids in YAML.
    Numeric(u64),
}

fn deserialize_accounts<'de, D>(deserializer: D) -> Result<Vec<Account>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<AccountEntry>::deserialize(deserializer)?
        .into_iter()
        .map(|entry| match entry {
            AccountEntry::Full(account) => Ok(account),
            AccountEntry::Short(s) => parse_account(&s).map_err(serde::de::Error::custom),
            AccountEntry::Numeric(id) => Ok(Account::from_profile(id.to_string())),
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CellScript {
    /// Records returned on success; 0 returns no data.
    pub records: usize,
    /// Error codes raised by successive attempts before the cell succeeds.
    pub errors: Vec<String>,
    /// Error code raised by every attempt once `errors` is used up.
    pub fail_with: Option<String>,
    pub message: Option<String>,
    pub retry_after_ms: Option<u64>,
    /// Sleep before answering, per attempt.
    pub delay_ms: Option<u64>,
    pub panic: bool,
}

impl Default for CellScript {
    fn default() -> Self {
        Self {
            records: 1,
            errors: Vec::new(),
            fail_with: None,
            message: None,
            retry_after_ms: None,
            delay_ms: None,
            panic: false,
        }
    }
}

impl CellScript {
    fn error_for(&self, attempt: usize) -> Option<ProviderError> {
        let code = self.errors.get(attempt).or(self.fail_with.as_ref())?;
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("scripted {code}"));
        let mut error = ProviderError::new(code.as_str(), message);
        if let Some(ms) = self.retry_after_ms {
            error = error.with_retry_after(Duration::from_millis(ms));
        }
        Some(error)
    }
}

#[derive(Debug, Deserialize)]
pub struct CellOverride {
    /// Account id.
    pub account: String,
    /// Omit to apply to every region of the account.
    pub region: Option<String>,
    #[serde(flatten)]
    pub script: CellScript,
}

impl Scenario {
    /// One script per task, in task order.
    pub fn scripts(&self) -> Result<Vec<CellScript>, String> {
        for cell in &self.cells {
            if !self.accounts.iter().any(|a| a.id == cell.account) {
                return Err(format!("cell references unknown account {:?}", cell.account));
            }
            if let Some(region) = &cell.region {
                if !self.regions.contains(region) {
                    return Err(format!("cell references unknown region {region:?}"));
                }
            }
        }

        Ok(build_tasks(&self.accounts, &self.regions)
            .iter()
            .map(|task| {
                // the last matching override wins
                self.cells
                    .iter()
                    .rev()
                    .find(|c| {
                        c.account == task.account.id
                            && c.region.as_deref().map_or(true, |r| r == task.region)
                    })
                    .map(|c| c.script.clone())
                    .unwrap_or_else(|| self.default.clone())
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct SimulateResult {
    run_id: String,
    service: String,
    total: usize,
    succeeded: usize,
    failed: usize,
    failed_run: bool,
    duration_ms: u64,
    summary: String,
    records: Vec<String>,
    errors: Vec<TaskError>,
    metrics: serde_json::Value,
}

#[allow(clippy::too_many_arguments)]
pub async fn simulate_cmd(
    path: &Path,
    progress: bool,
    events: bool,
    report_limit: usize,
    config: ConfigArgs,
    workers: WorkerArgs,
    retry: RetryArgs,
    rate: RateLimitArgs,
    output: OutputArgs,
) -> i32 {
    let prepared = read_json_or_yaml::<Scenario>(path).and_then(|scenario| {
        let scripts = scenario.scripts()?;
        let file = load_file_config(config.config.as_deref())?;
        let exec_config = build_execution_config(&file, &workers, &retry)?;
        let registry = build_registry(&file, &rate)?;
        Ok((scenario, scripts, exec_config, registry))
    });
    let (scenario, scripts, exec_config, registry) = match prepared {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };
    tracing::debug!(
        scenario = %path.display(),
        service = %scenario.service,
        tasks = scripts.len(),
        "scenario loaded"
    );

    let base: Arc<dyn EventSink> = if events {
        Arc::new(StdoutEventSink)
    } else {
        Arc::new(TracingEventSink)
    };
    let metrics = Arc::new(MetricsCollector::new(scenario.service.as_str()));
    let sink = Arc::new(MetricsEventSink::new(metrics.clone(), base));

    let mut executor = match Executor::new(
        exec_config,
        Arc::new(StaticSessionProvider::new(())),
        Arc::new(registry),
    ) {
        Ok(e) => e.with_event_sink(sink),
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::INVALID_INPUT;
        }
    };
    if progress && !output.quiet {
        executor = executor.with_progress(Arc::new(TerminalProgress::new()));
    }

    let attempts: Arc<Vec<AtomicUsize>> =
        Arc::new(scripts.iter().map(|_| AtomicUsize::new(0)).collect());
    let scripts = Arc::new(scripts);

    let result = executor
        .execute(
            &scenario.accounts,
            &scenario.regions,
            &scenario.service,
            move |ctx: TaskContext<()>| {
                let scripts = scripts.clone();
                let attempts = attempts.clone();
                async move { run_cell(&ctx, &scripts, &attempts).await }
            },
        )
        .await;

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::INVALID_INPUT;
        }
    };

    if result.has_any_failure() {
        print_warning(output.format, output.quiet, &result.error_summary());
        print_warning(output.format, output.quiet, result.error_report(report_limit).trim_end());
    }

    let failed_run = result.is_failed_run();
    let summary = SimulateResult {
        run_id: result.run_id().to_string(),
        service: result.service().to_string(),
        total: result.total_count(),
        succeeded: result.success_count(),
        failed: result.error_count(),
        failed_run,
        duration_ms: result.total_duration().as_millis() as u64,
        summary: result.error_summary(),
        errors: result.errors().errors(),
        metrics: metrics.get_metrics().await.to_json(),
        records: result.into_flat_data(),
    };
    print_result(output.format, output.quiet, &summary);

    if failed_run {
        exit_codes::RUN_FAILED
    } else {
        exit_codes::SUCCESS
    }
}

async fn run_cell(
    ctx: &TaskContext<()>,
    scripts: &[CellScript],
    attempts: &[AtomicUsize],
) -> Result<Option<Vec<String>>, ProviderError> {
    let index = ctx.task().index;
    let script = scripts.get(index).cloned().unwrap_or_default();
    let attempt = attempts
        .get(index)
        .map(|a| a.fetch_add(1, Ordering::SeqCst))
        .unwrap_or(0);

    if let Some(ms) = script.delay_ms {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    if script.panic {
        panic!("scripted panic in {}", ctx.task());
    }
    if let Some(error) = script.error_for(attempt) {
        return Err(error);
    }
    if script.records == 0 {
        return Ok(None);
    }
    Ok(Some(
        (0..script.records)
            .map(|n| format!("{}/{}/{n}", ctx.account_id(), ctx.region()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
service: ec2
accounts:
  - { id: "111", name: prod }
  - { id: "222", name: dev }
regions: [us-east-1, eu-west-1]
default:
  records: 2
cells:
  - account: "222"
    fail_with: AccessDenied
  - account: "222"
    region: eu-west-1
    errors: [Throttling]
"#;

    #[test]
    fn scripts_follow_task_order_and_overrides() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        let scripts = scenario.scripts().unwrap();
        assert_eq!(scripts.len(), 4);
        assert_eq!(scripts[0].records, 2);
        assert_eq!(scripts[2].fail_with.as_deref(), Some("AccessDenied"));
        assert_eq!(scripts[3].errors, vec!["Throttling".to_string()]);
        assert_eq!(scripts[3].fail_with, None);
        assert_eq!(scripts[3].records, 1);
    }

    #[test]
    fn errors_then_fail_with() {
        let script = CellScript {
            errors: vec!["Throttling".to_string()],
            fail_with: Some("InternalError".to_string()),
            ..CellScript::default()
        };
        assert_eq!(script.error_for(0).unwrap().code, "Throttling");
        assert_eq!(script.error_for(5).unwrap().code, "InternalError");
        assert!(CellScript::default().error_for(0).is_none());
    }

    #[test]
    fn accounts_accept_the_flag_form() {
        let scenario: Scenario = serde_yaml::from_str(
            "service: ec2\naccounts: [\"111111111111\", \"222222222222=prod\", 333333333333, {id: \"444\", name: dev}]\nregions: [us-east-1]\n",
        )
        .unwrap();
        assert_eq!(
            scenario.accounts,
            vec![
                Account::new("111111111111", "111111111111"),
                Account::new("222222222222", "prod"),
                Account::new("333333333333", "333333333333"),
                Account::new("444", "dev"),
            ]
        );
        assert!(serde_yaml::from_str::<Scenario>("accounts: [\"=x\"]\nregions: [r]\n").is_err());
    }

    #[test]
    fn unknown_cell_account_rejected() {
        let scenario: Scenario = serde_yaml::from_str(
            "accounts: [{id: a, name: a}]\nregions: [r]\ncells: [{account: b}]\n",
        )
        .unwrap();
        assert!(scenario.scripts().is_err());
    }
}

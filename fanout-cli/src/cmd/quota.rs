use fanout_core::{QuotaSnapshot, QuotaUsage};
use serde::Serialize;

use crate::cmd::config::{build_thresholds, load_file_config};
use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{ConfigArgs, OutputArgs};

#[derive(Debug, Serialize)]
struct QuotaResult {
    limit: f64,
    usage: Option<f64>,
    usage_percent: Option<f64>,
    status: &'static str,
    high: bool,
}

pub async fn quota_cmd(
    limit: f64,
    usage: Option<f64>,
    config: ConfigArgs,
    output: OutputArgs,
) -> i32 {
    let thresholds = match load_file_config(config.config.as_deref()) {
        Ok(file) => build_thresholds(&file),
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };
    if !limit.is_finite() || usage.is_some_and(|u| !u.is_finite() || u < 0.0) {
        print_error(output.format, output.quiet, "limit and usage must be finite, usage non-negative");
        return exit_codes::INVALID_INPUT;
    }

    let snapshot = QuotaSnapshot::from_usage(QuotaUsage::new("cli", "cli", limit, usage), &thresholds);
    print_result(
        output.format,
        output.quiet,
        &QuotaResult {
            limit,
            usage,
            usage_percent: snapshot.usage_percent,
            status: snapshot.status.as_str(),
            high: snapshot.status.is_high(),
        },
    );
    exit_codes::SUCCESS
}

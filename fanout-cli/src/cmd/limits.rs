use std::collections::BTreeSet;

use fanout_exec::ratelimit::{DEFAULT_SERVICE, PRESETS};
use serde::Serialize;

use crate::cmd::config::{build_registry, load_file_config};
use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{ConfigArgs, OutputArgs, RateLimitArgs};

#[derive(Debug, Serialize)]
struct LimitRow {
    service: String,
    requests_per_second: f64,
    burst_size: u32,
    source: &'static str,
}

pub async fn limits_cmd(
    services: &[String],
    config: ConfigArgs,
    rate: RateLimitArgs,
    output: OutputArgs,
) -> i32 {
    let registry = match load_file_config(config.config.as_deref())
        .and_then(|file| build_registry(&file, &rate))
    {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };

    let names: BTreeSet<String> = if services.is_empty() {
        PRESETS
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(registry.overrides().keys().cloned())
            .collect()
    } else {
        services.iter().cloned().collect()
    };

    let rows: Vec<LimitRow> = names
        .into_iter()
        .map(|service| {
            let cfg = registry.config_for(&service);
            let source = if registry.overrides().contains_key(&service) {
                "override"
            } else if PRESETS.iter().any(|(name, _)| *name == service) {
                "preset"
            } else {
                DEFAULT_SERVICE
            };
            LimitRow {
                service,
                requests_per_second: cfg.requests_per_second,
                burst_size: cfg.burst_size,
                source,
            }
        })
        .collect();

    print_result(output.format, output.quiet, &rows);
    exit_codes::SUCCESS
}

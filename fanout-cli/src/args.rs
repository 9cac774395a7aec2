use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// JSON or YAML file with `execution`, `rate_limits` and `quota` sections.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct MatrixArgs {
    #[arg(long = "account", value_name = "ID[=NAME]")]
    pub accounts: Vec<String>,
    /// JSON or YAML list of `{id, name}` objects.
    #[arg(long)]
    pub accounts_file: Option<PathBuf>,
    #[arg(long = "region", value_name = "REGION")]
    pub regions: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct WorkerArgs {
    #[arg(long)]
    pub max_workers: Option<usize>,
    /// Per-attempt timeout in milliseconds.
    #[arg(long)]
    pub task_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RetryArgs {
    #[arg(long)]
    pub retry_max: Option<usize>,
    #[arg(long)]
    pub retry_base_delay_ms: Option<u64>,
    #[arg(long)]
    pub retry_max_delay_ms: Option<u64>,
    /// `full` or `none`.
    #[arg(long)]
    pub retry_jitter: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RateLimitArgs {
    #[arg(long = "rate-limit", value_name = "SERVICE=RPS[:BURST]")]
    pub rate_limits: Vec<String>,
}

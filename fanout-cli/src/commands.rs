use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the account × region task matrix in execution order.
    Plan {
        #[command(flatten)]
        matrix: MatrixArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Classify a provider error code (and optional message).
    Classify {
        code: String,
        message: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print effective per-service rate limits.
    Limits {
        #[arg(long = "service")]
        services: Vec<String>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        rate: RateLimitArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compute usage percent and status for a quota.
    Quota {
        #[arg(long)]
        limit: f64,
        #[arg(long)]
        usage: Option<f64>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the executor against a scripted scenario file.
    Simulate {
        scenario: PathBuf,
        /// Render a progress line on stderr.
        #[arg(long)]
        progress: bool,
        /// Stream executor events as JSON lines on stdout.
        #[arg(long)]
        events: bool,
        /// Errors listed per category in the report.
        #[arg(long, default_value_t = 5)]
        report_limit: usize,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        workers: WorkerArgs,
        #[command(flatten)]
        retry: RetryArgs,
        #[command(flatten)]
        rate: RateLimitArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod logging;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "fanout", version, about = "Multi-account/region execution diagnostics")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(logging::LogLevel::from(cli.verbose));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Plan { matrix, output } => cmd::plan::plan_cmd(matrix, output).await,
        Command::Classify {
            code,
            message,
            output,
        } => cmd::classify::classify_cmd(&code, message.as_deref(), output).await,
        Command::Limits {
            services,
            config,
            rate,
            output,
        } => cmd::limits::limits_cmd(&services, config, rate, output).await,
        Command::Quota {
            limit,
            usage,
            config,
            output,
        } => cmd::quota::quota_cmd(limit, usage, config, output).await,
        Command::Simulate {
            scenario,
            progress,
            events,
            report_limit,
            config,
            workers,
            retry,
            rate,
            output,
        } => {
            cmd::simulate::simulate_cmd(
                &scenario,
                progress,
                events,
                report_limit,
                config,
                workers,
                retry,
                rate,
                output,
            )
            .await
        }
    }
}

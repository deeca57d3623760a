// crates/lockstep-cli/src/main.rs
//
// CLI entrypoint for the Lockstep developer tools.
//
// Provides subcommands for running scripted ledger scenarios, inspecting a
// genesis configuration, and evaluating vesting release curves.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::curve::CurveCmd;
use commands::genesis::GenesisCmd;
use commands::run::RunCmd;
use output::OutputFormat;

/// Lockstep CLI: token vesting and staking ledgers on an in-memory chain.
#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    version = "0.1.0",
    about = "Lockstep CLI for the vesting and staking ledgers"
)]
struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Log level; overrides the level configured for the chain.
    /// RUST_LOG takes precedence over both.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a scenario file against a fresh chain.
    Run(RunCmd),

    /// Show the accounts and balances a chain config starts with.
    Genesis(GenesisCmd),

    /// Evaluate a release curve at given times.
    Curve(CurveCmd),
}

/// Install the tracing subscriber. `RUST_LOG` wins over `level`.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(cmd) => {
            let scenario = lockstep_host::Scenario::load(&cmd.scenario)?;
            init_tracing(cli.log_level.as_deref().unwrap_or(&scenario.chain.log_level));
            commands::run::run(cmd, &scenario, &cli.format)?
        }
        Commands::Genesis(cmd) => {
            init_tracing(cli.log_level.as_deref().unwrap_or("info"));
            commands::genesis::run(cmd, &cli.format)?
        }
        Commands::Curve(cmd) => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            commands::curve::run(cmd, &cli.format)?
        }
    }

    Ok(())
}

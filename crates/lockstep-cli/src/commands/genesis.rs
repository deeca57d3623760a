// crates/lockstep-cli/src/commands/genesis.rs
//
// `lockstep genesis`: show the accounts a chain configuration starts with.

use clap::Args;

use lockstep_host::{Chain, ChainConfig};

use crate::commands::run::{account_rows, AccountRow};
use crate::output::{format_json, format_table, OutputFormat};

/// Genesis inspection arguments.
#[derive(Debug, Args)]
pub struct GenesisCmd {
    /// Path to the chain configuration (TOML).
    #[arg(long, default_value = "lockstep.toml")]
    config: String,
}

/// Run the genesis command.
pub fn run(cmd: &GenesisCmd, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to defaults if the file is not found.
    let config = match ChainConfig::load(&cmd.config) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", cmd.config);
            cfg
        }
        Err(e) => {
            tracing::warn!("Could not load config from {}: {}. Using defaults.", cmd.config, e);
            ChainConfig::default()
        }
    };

    let chain = Chain::from_config(&config)?;
    let rows: Vec<AccountRow> = account_rows(&chain, &config);

    match format {
        OutputFormat::Table => {
            println!("Token: {}  |  Start: {}", config.token_symbol, config.start_time);
            println!();
            println!("{}", format_table(&rows));
        }
        OutputFormat::Json => println!("{}", format_json(&rows)),
    }
    Ok(())
}

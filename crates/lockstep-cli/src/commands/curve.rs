// crates/lockstep-cli/src/commands/curve.rs
//
// `lockstep curve`: evaluate a vesting release curve at given times.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use lockstep_core::{Timestamp, Tokens};
use lockstep_vesting::{unlocked_amount, VestingPosition};

use crate::output::{format_json, format_table, OutputFormat};

/// Release curve parameters.
#[derive(Debug, Args)]
pub struct CurveCmd {
    /// Start date (seconds since the Unix epoch). Nothing unlocks until
    /// strictly after it.
    #[arg(long)]
    start: Timestamp,
    /// End date. Everything is unlocked strictly after it.
    #[arg(long)]
    end: Timestamp,
    /// Cliff amount released right after the start date, e.g. "1".
    #[arg(long)]
    start_tokens: Tokens,
    /// Total amount of the position, e.g. "3".
    #[arg(long)]
    total_tokens: Tokens,
    /// Times to evaluate the curve at.
    #[arg(long, num_args = 1.., required = true)]
    at: Vec<Timestamp>,
}

#[derive(Tabled, Serialize)]
struct CurveRow {
    #[tabled(rename = "Time")]
    time: Timestamp,
    #[tabled(rename = "Elapsed (s)")]
    elapsed: u64,
    #[tabled(rename = "Unlocked")]
    unlocked: String,
    #[tabled(rename = "Locked")]
    locked: String,
}

/// Run the curve command.
pub fn run(cmd: &CurveCmd, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    if cmd.end < cmd.start {
        return Err(format!("end {} is before start {}", cmd.end, cmd.start).into());
    }
    if cmd.total_tokens < cmd.start_tokens {
        return Err("total tokens must cover the start tokens".into());
    }
    let position = VestingPosition::new(
        cmd.start,
        cmd.end,
        cmd.start_tokens.units(),
        cmd.total_tokens.units(),
    );

    let rows: Vec<CurveRow> = cmd
        .at
        .iter()
        .map(|&time| {
            let unlocked = unlocked_amount(&position, time);
            CurveRow {
                time,
                elapsed: time.saturating_sub(cmd.start),
                unlocked: Tokens(unlocked).to_string(),
                locked: Tokens(position.total_tokens - unlocked).to_string(),
            }
        })
        .collect();

    match format {
        OutputFormat::Table => println!("{}", format_table(&rows)),
        OutputFormat::Json => println!("{}", format_json(&rows)),
    }
    Ok(())
}

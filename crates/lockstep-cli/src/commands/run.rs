// crates/lockstep-cli/src/commands/run.rs
//
// `lockstep run <scenario>`: execute a scenario and print per-step results
// along with the resulting ledger state.

use std::collections::BTreeSet;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use lockstep_core::{Address, LedgerEvent, Tokens};
use lockstep_host::{Chain, ChainConfig, Scenario, StepOutcome};

use crate::output::{format_json, format_table, OutputFormat};

/// Scenario run arguments.
#[derive(Debug, Args)]
pub struct RunCmd {
    /// Path to the scenario file (TOML).
    pub scenario: String,

    /// Stop at the first rejected step.
    #[arg(long)]
    pub stop_on_error: bool,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "At")]
    at: u64,
    #[tabled(rename = "Op")]
    op: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Event")]
    name: String,
    #[tabled(rename = "Payload")]
    payload: String,
}

/// Balances of one labelled account.
#[derive(Tabled, Serialize)]
pub struct AccountRow {
    #[tabled(rename = "Account")]
    pub label: String,
    #[tabled(rename = "Address")]
    pub address: String,
    #[tabled(rename = "Balance")]
    pub balance: String,
    #[tabled(rename = "Vesting")]
    pub vesting: String,
    #[tabled(rename = "Staked")]
    pub staked: String,
}

#[derive(Serialize)]
struct Report<'a> {
    steps: &'a [StepOutcome],
    events: &'a [LedgerEvent],
    accounts: Vec<AccountRow>,
    invariants: String,
}

/// One row per genesis account plus the two ledgers.
pub fn account_rows(chain: &Chain, config: &ChainConfig) -> Vec<AccountRow> {
    let mut labels: BTreeSet<&str> = config.balances.iter().map(|b| b.account.as_str()).collect();
    labels.insert(config.owner.as_str());
    labels.insert(config.vesting_label.as_str());
    labels.insert(config.staking_label.as_str());

    labels
        .into_iter()
        .map(|label| {
            let address = Address::from_label(label);
            AccountRow {
                label: label.to_string(),
                address: address.short(),
                balance: Tokens(chain.token_balance(&address)).to_string(),
                vesting: Tokens(chain.vesting().balance_of(&address)).to_string(),
                staked: Tokens(chain.staking().staked_with_rewards(&address)).to_string(),
            }
        })
        .collect()
}

/// Run the scenario.
pub fn run(
    cmd: &RunCmd,
    scenario: &Scenario,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(steps = scenario.steps.len(), "Running scenario {}", cmd.scenario);
    let (chain, outcomes) = scenario.run(cmd.stop_on_error)?;
    let invariants = match chain.check_invariants() {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };
    let accounts = account_rows(&chain, &scenario.chain);

    match format {
        OutputFormat::Json => {
            let report = Report {
                steps: &outcomes,
                events: chain.events(),
                accounts,
                invariants,
            };
            println!("{}", format_json(&report));
        }
        OutputFormat::Table => {
            let steps: Vec<StepRow> = outcomes
                .iter()
                .map(|o| StepRow {
                    index: o.index,
                    at: o.at,
                    op: o.op.to_string(),
                    result: if o.ok { "ok" } else { "rejected" }.to_string(),
                    detail: o.detail.clone(),
                })
                .collect();
            let events: Vec<EventRow> = chain
                .events()
                .iter()
                .enumerate()
                .map(|(index, e)| EventRow {
                    index,
                    name: e.name().to_string(),
                    payload: serde_json::to_string(e).unwrap_or_default(),
                })
                .collect();

            println!("Steps");
            println!("{}", format_table(&steps));
            println!();
            println!("Events");
            println!("{}", format_table(&events));
            println!();
            println!("Accounts");
            println!("{}", format_table(&accounts));
            println!();
            println!(
                "Vested: {}  |  Staked + rewards: {}  |  Free rewards: {}  |  Pools: {}",
                Tokens(chain.vesting().vested()),
                Tokens(chain.staking().staked_and_rewards()),
                Tokens(chain.staking().total_free_rewards()),
                chain.staking().pool_count()
            );
            println!("Invariants: {}", invariants);
        }
    }

    let rejected = outcomes.iter().filter(|o| !o.ok).count();
    if rejected > 0 {
        tracing::info!(rejected, "Some steps were rejected and rolled back");
    }
    Ok(())
}

// crates/lockstep-host/src/scenario.rs
//
// Scripted scenarios: a genesis `[chain]` table followed by an ordered list
// of `[[step]]` entries, each naming an operation in its `op` field.
//
// Accounts are labels (see `Address::from_label`), amounts are decimal
// token strings, and every time is an offset in seconds from the chain's
// `start_time`. A step without `caller` runs as the genesis owner.
//
//     [chain]
//     [[chain.balances]]
//     account = "owner"
//     amount = "1000"
//
//     [[step]]
//     op = "approve"
//     spender = "vesting"
//     amount = "1000"
//
//     [[step]]
//     op = "create_vest"
//     account = "alice"
//     start = 60
//     end = 864060
//     start_tokens = "1"
//     total_tokens = "3"

use std::fs;

use serde::{Deserialize, Serialize};

use lockstep_core::events::AssetKind;
use lockstep_core::{Address, Amount, LockstepError, Timestamp, Tokens};
use lockstep_staking::PoolParams;

use crate::chain::{Chain, LedgerKind};
use crate::config::{token_amount, AssetSpec, ChainConfig};

/// A parsed scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Pool parameters as written in a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSpec {
    #[serde(deserialize_with = "token_amount")]
    pub min_stake: Amount,
    #[serde(deserialize_with = "token_amount")]
    pub max_stake: Amount,
    pub start: u64,
    pub end: u64,
    pub reward_permill: u32,
    pub lock_period: u64,
    #[serde(deserialize_with = "token_amount")]
    pub max_total_staked: Amount,
}

/// One entry of a batch grant.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantSpec {
    pub account: String,
    pub start: u64,
    pub end: u64,
    #[serde(deserialize_with = "token_amount")]
    pub start_tokens: Amount,
    #[serde(deserialize_with = "token_amount")]
    pub total_tokens: Amount,
}

/// A single scripted operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Move chain time forward.
    Advance { seconds: u64 },
    Approve {
        #[serde(default)]
        caller: Option<String>,
        spender: String,
        #[serde(deserialize_with = "token_amount")]
        amount: Amount,
    },
    /// Plain token transfer, outside either ledger.
    Send {
        #[serde(default)]
        caller: Option<String>,
        to: String,
        #[serde(deserialize_with = "token_amount")]
        amount: Amount,
        #[serde(default)]
        asset: AssetSpec,
    },
    CreateVest {
        #[serde(default)]
        caller: Option<String>,
        account: String,
        start: u64,
        end: u64,
        #[serde(deserialize_with = "token_amount")]
        start_tokens: Amount,
        #[serde(deserialize_with = "token_amount")]
        total_tokens: Amount,
    },
    MassCreateVest {
        #[serde(default)]
        caller: Option<String>,
        grants: Vec<GrantSpec>,
    },
    SetStakeAddress {
        #[serde(default)]
        caller: Option<String>,
    },
    Claim {
        #[serde(default)]
        caller: Option<String>,
    },
    ClaimFor {
        #[serde(default)]
        caller: Option<String>,
        account: String,
    },
    ClaimOneFor {
        #[serde(default)]
        caller: Option<String>,
        account: String,
        index: usize,
    },
    ClaimToStake {
        #[serde(default)]
        caller: Option<String>,
        pool: usize,
    },
    AddStakePool {
        #[serde(default)]
        caller: Option<String>,
        pool: PoolSpec,
    },
    Deposit {
        #[serde(default)]
        caller: Option<String>,
        pool: usize,
        #[serde(deserialize_with = "token_amount")]
        amount: Amount,
    },
    /// Withdraw all matured staking positions.
    Withdraw {
        #[serde(default)]
        caller: Option<String>,
    },
    ClaimStake {
        #[serde(default)]
        caller: Option<String>,
        index: usize,
    },
    ReclaimRewards {
        #[serde(default)]
        caller: Option<String>,
    },
    Recover {
        #[serde(default)]
        caller: Option<String>,
        ledger: LedgerKind,
        #[serde(default)]
        asset: AssetSpec,
        /// Omitted or "0" sweeps everything available.
        #[serde(default, deserialize_with = "token_amount")]
        amount: Amount,
    },
    TransferOwnership {
        #[serde(default)]
        caller: Option<String>,
        ledger: LedgerKind,
        new_owner: String,
    },
}

/// What happened when a step ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    /// Chain time the step ran at.
    pub at: Timestamp,
    pub ok: bool,
    /// Result summary, or the error message of a rejected step.
    pub detail: String,
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn load(path: &str) -> Result<Self, LockstepError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LockstepError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&contents)
    }

    /// Parse a scenario from TOML text.
    pub fn parse(contents: &str) -> Result<Self, LockstepError> {
        toml::from_str(contents).map_err(|e| LockstepError::Config(e.to_string()))
    }

    /// Build the chain and run every step in order.
    ///
    /// A rejected step is recorded and rolled back; later steps still run
    /// unless `stop_on_error` is set.
    pub fn run(&self, stop_on_error: bool) -> Result<(Chain, Vec<StepOutcome>), LockstepError> {
        let mut chain = Chain::from_config(&self.chain)?;
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let at = chain.now();
            let result = step.apply(&mut chain, self.chain.start_time);
            let ok = result.is_ok();
            let detail = match result {
                Ok(detail) => detail,
                Err(e) => e.to_string(),
            };
            tracing::debug!(index, op = step.name(), ok, "{}", detail);
            outcomes.push(StepOutcome {
                index,
                op: step.name(),
                at,
                ok,
                detail,
            });
            if !ok && stop_on_error {
                break;
            }
        }
        Ok((chain, outcomes))
    }
}

impl Step {
    /// The step's `op` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Advance { .. } => "advance",
            Step::Approve { .. } => "approve",
            Step::Send { .. } => "send",
            Step::CreateVest { .. } => "create_vest",
            Step::MassCreateVest { .. } => "mass_create_vest",
            Step::SetStakeAddress { .. } => "set_stake_address",
            Step::Claim { .. } => "claim",
            Step::ClaimFor { .. } => "claim_for",
            Step::ClaimOneFor { .. } => "claim_one_for",
            Step::ClaimToStake { .. } => "claim_to_stake",
            Step::AddStakePool { .. } => "add_stake_pool",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::ClaimStake { .. } => "claim_stake",
            Step::ReclaimRewards { .. } => "reclaim_rewards",
            Step::Recover { .. } => "recover",
            Step::TransferOwnership { .. } => "transfer_ownership",
        }
    }

    /// Run this step against `chain`. `origin` is the time offsets are
    /// measured from.
    pub fn apply(&self, chain: &mut Chain, origin: Timestamp) -> Result<String, LockstepError> {
        let owner = chain.owner();
        let who = |caller: &Option<String>| match caller {
            Some(label) => Address::from_label(label),
            None => owner,
        };
        let at = |offset: u64| origin.checked_add(offset).ok_or(LockstepError::Overflow);

        match self {
            Step::Advance { seconds } => {
                let now = chain.advance_time(*seconds);
                Ok(format!("now {}", now))
            }
            Step::Approve {
                caller,
                spender,
                amount,
            } => {
                let caller = who(caller);
                chain.approve(caller, Address::from_label(spender), *amount)?;
                Ok(format!("{} may pull {}", spender, Tokens(*amount)))
            }
            Step::Send {
                caller,
                to,
                amount,
                asset,
            } => {
                let caller = who(caller);
                chain.transfer_tokens(caller, Address::from_label(to), asset, *amount)?;
                Ok(format!("sent {} to {}", Tokens(*amount), to))
            }
            Step::CreateVest {
                caller,
                account,
                start,
                end,
                start_tokens,
                total_tokens,
            } => {
                let caller = who(caller);
                chain.create_vest(
                    caller,
                    Address::from_label(account),
                    at(*start)?,
                    at(*end)?,
                    *start_tokens,
                    *total_tokens,
                )?;
                Ok(format!("{} vests {}", account, Tokens(*total_tokens)))
            }
            Step::MassCreateVest { caller, grants } => {
                let caller = who(caller);
                let accounts: Vec<Address> =
                    grants.iter().map(|g| Address::from_label(&g.account)).collect();
                let starts = grants
                    .iter()
                    .map(|g| at(g.start))
                    .collect::<Result<Vec<_>, _>>()?;
                let ends = grants
                    .iter()
                    .map(|g| at(g.end))
                    .collect::<Result<Vec<_>, _>>()?;
                let cliffs: Vec<Amount> = grants.iter().map(|g| g.start_tokens).collect();
                let totals: Vec<Amount> = grants.iter().map(|g| g.total_tokens).collect();
                chain.mass_create_vest(caller, &accounts, &starts, &ends, &cliffs, &totals)?;
                Ok(format!("{} grants", grants.len()))
            }
            Step::SetStakeAddress { caller } => {
                let caller = who(caller);
                chain.set_stake_address(caller)?;
                Ok("bridge bound".to_string())
            }
            Step::Claim { caller } => {
                let caller = who(caller);
                let paid = chain.claim(caller)?;
                Ok(format!("paid {}", Tokens(paid)))
            }
            Step::ClaimFor { caller, account } => {
                let caller = who(caller);
                let paid = chain.claim_for(caller, Address::from_label(account))?;
                Ok(format!("paid {} to {}", Tokens(paid), account))
            }
            Step::ClaimOneFor {
                caller,
                account,
                index,
            } => {
                let caller = who(caller);
                let paid = chain.claim_one_for(caller, Address::from_label(account), *index)?;
                Ok(format!("paid {} to {}", Tokens(paid), account))
            }
            Step::ClaimToStake { caller, pool } => {
                let caller = who(caller);
                let staked = chain.claim_to_stake(caller, *pool)?;
                Ok(format!("staked {} in pool {}", Tokens(staked), pool))
            }
            Step::AddStakePool { caller, pool } => {
                let caller = who(caller);
                let params = PoolParams {
                    min_stake: pool.min_stake,
                    max_stake: pool.max_stake,
                    start_time: at(pool.start)?,
                    end_time: at(pool.end)?,
                    reward_permill: pool.reward_permill,
                    lock_period: pool.lock_period,
                    max_total_staked: pool.max_total_staked,
                };
                let id = chain.add_stake_pool(caller, params)?;
                Ok(format!("pool {}", id))
            }
            Step::Deposit {
                caller,
                pool,
                amount,
            } => {
                let caller = who(caller);
                let position = chain.deposit(caller, *pool, *amount)?;
                Ok(format!(
                    "locked {} until {}",
                    Tokens(position.total_amount),
                    position.end_time
                ))
            }
            Step::Withdraw { caller } => {
                let caller = who(caller);
                let paid = chain.withdraw(caller)?;
                Ok(format!("paid {}", Tokens(paid)))
            }
            Step::ClaimStake { caller, index } => {
                let caller = who(caller);
                let paid = chain.claim_stake(caller, *index)?;
                Ok(format!("paid {}", Tokens(paid)))
            }
            Step::ReclaimRewards { caller } => {
                let caller = who(caller);
                let amount = chain.reclaim_rewards(caller)?;
                Ok(format!("reclaimed {}", Tokens(amount)))
            }
            Step::Recover {
                caller,
                ledger,
                asset,
                amount,
            } => {
                let caller = who(caller);
                let kind = match asset {
                    AssetSpec::Managed => AssetKind::Managed,
                    AssetSpec::Native => AssetKind::Native,
                    AssetSpec::Foreign(label) => AssetKind::Foreign(Address::from_label(label)),
                };
                let swept = chain.recover(caller, *ledger, kind, *amount)?;
                Ok(format!("recovered {}", Tokens(swept)))
            }
            Step::TransferOwnership {
                caller,
                ledger,
                new_owner,
            } => {
                let caller = who(caller);
                chain.transfer_ownership(caller, *ledger, Address::from_label(new_owner))?;
                Ok(format!("{:?} now owned by {}", ledger, new_owner))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::UNIT;

    const SCRIPT: &str = r#"
        [chain]
        start_time = 1000

        [[chain.balances]]
        account = "owner"
        amount = "100"

        [[step]]
        op = "approve"
        spender = "vesting"
        amount = "100"

        [[step]]
        op = "create_vest"
        account = "alice"
        start = 10
        end = 110
        start_tokens = "1"
        total_tokens = "3"

        [[step]]
        op = "claim"
        caller = "alice"

        [[step]]
        op = "advance"
        seconds = 60

        [[step]]
        op = "claim"
        caller = "alice"
    "#;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        assert_eq!(scenario.chain.start_time, 1000);
        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(scenario.steps[1].name(), "create_vest");
        match &scenario.steps[1] {
            Step::CreateVest { total_tokens, caller, .. } => {
                assert_eq!(*total_tokens, 3 * UNIT);
                assert!(caller.is_none());
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_run_records_failures_and_continues() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        let (chain, outcomes) = scenario.run(false).unwrap();

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes[0].ok && outcomes[1].ok);
        // Before the start date nothing has unlocked.
        assert!(!outcomes[2].ok);
        assert_eq!(outcomes[2].detail, LockstepError::NothingToClaim.to_string());
        // At t = 1060: 1 + floor(2 * 50 / 100) = 2 tokens.
        assert!(outcomes[4].ok);
        assert_eq!(outcomes[4].at, 1060);
        assert_eq!(chain.token_balance(&Address::from_label("alice")), 2 * UNIT);
    }

    #[test]
    fn test_run_stops_on_error() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        let (_, outcomes) = scenario.run(true).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[2].ok);
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let result = Scenario::parse(
            r#"
            [[step]]
            op = "mint_everything"
            "#,
        );
        assert!(matches!(result, Err(LockstepError::Config(_))));
    }
}

// crates/lockstep-core/src/events.rs
//
// Notifications emitted by state-changing ledger operations.
//
// Events carry no behavior. They are buffered per operation and only
// published by the host once the operation commits.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Timestamp};

/// Which asset a recovery sweep moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// The chain's native coin.
    Native,
    /// The token the ledger keeps obligations in.
    Managed,
    /// Any other token, identified by its ledger address.
    Foreign(Address),
}

/// A structured notification from a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A vesting position was granted.
    VestAdded {
        account: Address,
        start_date: Timestamp,
        end_date: Timestamp,
        start_tokens: Amount,
        total_tokens: Amount,
    },
    /// Vested tokens were released for an account (paid out or staked).
    Claimed { account: Address, amount: Amount },
    /// A staking position was opened.
    Deposit {
        account: Address,
        pool_id: usize,
        amount: Amount,
        end_time: Timestamp,
    },
    /// Matured staking positions were paid out.
    Withdraw { account: Address, amount: Amount },
    /// A staking pool was created and its rewards reserved.
    PoolAdded {
        pool_id: usize,
        pool_hash: [u8; 32],
        max_total_staked: Amount,
        reserved_rewards: Amount,
    },
    /// The vesting ledger bound itself to a staking ledger.
    StakeAddressSet { stake_address: Address },
    /// Unfilled rewards of closed pools went back to the owner.
    RewardsReclaimed { amount: Amount, pools_closed: usize },
    /// Uncommitted funds were swept to the owner.
    Recovered {
        asset: AssetKind,
        to: Address,
        amount: Amount,
    },
    /// Ownership moved to a new address.
    OwnershipTransferred { previous: Address, new: Address },
}

impl LedgerEvent {
    /// Short event name, for tables and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::VestAdded { .. } => "VestAdded",
            LedgerEvent::Claimed { .. } => "Claimed",
            LedgerEvent::Deposit { .. } => "Deposit",
            LedgerEvent::Withdraw { .. } => "Withdraw",
            LedgerEvent::PoolAdded { .. } => "PoolAdded",
            LedgerEvent::StakeAddressSet { .. } => "StakeAddressSet",
            LedgerEvent::RewardsReclaimed { .. } => "RewardsReclaimed",
            LedgerEvent::Recovered { .. } => "Recovered",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

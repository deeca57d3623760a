// crates/lockstep-staking/src/position.rs

use serde::{Deserialize, Serialize};

use lockstep_core::{Amount, Timestamp};

use crate::pool::PoolHash;

/// One locked deposit. Withdrawable once `now > end_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPosition {
    /// Pool the deposit went into.
    pub pool_hash: PoolHash,
    /// Principal deposited.
    pub amount: Amount,
    /// Reward taken from the pool's reserve at deposit time.
    pub reward: Amount,
    /// Principal plus reward, paid out at withdrawal.
    pub total_amount: Amount,
    /// Deposit time plus the pool's lock period.
    pub end_time: Timestamp,
}

impl StakingPosition {
    /// Returns `true` once the lock has fully elapsed.
    pub fn is_mature(&self, now: Timestamp) -> bool {
        now > self.end_time
    }
}

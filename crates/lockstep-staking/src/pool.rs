// crates/lockstep-staking/src/pool.rs
//
// Staking pool parameters, identity hash, and reward arithmetic.
//
// A pool is immutable once created except for its running `total_staked`.
// Its hash is derived from all seven creation parameters plus the ledger's
// creation sequence number, so two pools with identical parameters still
// get distinct identities. The hash identifies the pool independently of
// its index, which shifts when closed pools are swap-removed.

use serde::{Deserialize, Serialize};

use lockstep_core::crypto::hash_fields;
use lockstep_core::{Amount, LockstepError, Timestamp};

/// Denominator of reward rates: rates are in thousandths.
pub const PERMILL_DENOMINATOR: Amount = 1000;

/// Stable identifier of a pool.
pub type PoolHash = [u8; 32];

/// The owner-chosen parameters of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Smallest cumulative principal one account may hold in the pool.
    pub min_stake: Amount,
    /// Largest cumulative principal one account may hold in the pool.
    pub max_stake: Amount,
    /// Deposits open at this time (inclusive).
    pub start_time: Timestamp,
    /// Deposits close at this time (exclusive).
    pub end_time: Timestamp,
    /// Reward per deposit, in thousandths of the principal.
    pub reward_permill: u32,
    /// How long each deposit stays locked.
    pub lock_period: u64,
    /// Capacity of the pool.
    pub max_total_staked: Amount,
}

impl PoolParams {
    /// Check the parameters against each other and against `now`.
    pub fn validate(&self, now: Timestamp) -> Result<(), LockstepError> {
        let fail = |msg: String| Err(LockstepError::InvalidArgument(msg));
        if self.min_stake > self.max_stake {
            return fail(format!(
                "min stake {} exceeds max stake {}",
                self.min_stake, self.max_stake
            ));
        }
        if self.max_stake == 0 {
            return fail("max stake must be positive".to_string());
        }
        if self.start_time <= now {
            return fail(format!(
                "start time {} is not in the future (now {})",
                self.start_time, now
            ));
        }
        if self.end_time <= self.start_time {
            return fail(format!(
                "end time {} is not after start time {}",
                self.end_time, self.start_time
            ));
        }
        if self.lock_period == 0 {
            return fail("lock period must be positive".to_string());
        }
        if self.max_total_staked < self.max_stake {
            return fail(format!(
                "capacity {} is below max stake {}",
                self.max_total_staked, self.max_stake
            ));
        }
        Ok(())
    }
}

/// A staking pool as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPool {
    pub params: PoolParams,
    /// Running sum of principal plus reward committed into this pool.
    pub total_staked: Amount,
    /// Position of this pool in the ledger's creation order, never reused.
    pub seq: u64,
    pub pool_hash: PoolHash,
}

impl StakingPool {
    pub fn new(params: PoolParams, seq: u64) -> Self {
        Self {
            pool_hash: pool_hash(&params, seq),
            params,
            total_staked: 0,
            seq,
        }
    }

    /// Returns `true` while deposits are accepted: `start <= now < end`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.params.start_time <= now && now < self.params.end_time
    }

    /// Returns `true` once the entry window has passed.
    pub fn is_closed(&self, now: Timestamp) -> bool {
        now >= self.params.end_time
    }

    /// Reward reserved for the unfilled part of the pool.
    pub fn unfilled_reward(&self) -> Result<Amount, LockstepError> {
        let unfilled = self
            .params
            .max_total_staked
            .saturating_sub(self.total_staked);
        reward_for(unfilled, self.params.reward_permill)
    }
}

/// Deterministic hash over all seven pool parameters and the creation
/// sequence number (big-endian fields).
pub fn pool_hash(params: &PoolParams, seq: u64) -> PoolHash {
    hash_fields(&[
        &seq.to_be_bytes(),
        &params.min_stake.to_be_bytes(),
        &params.max_stake.to_be_bytes(),
        &params.start_time.to_be_bytes(),
        &params.end_time.to_be_bytes(),
        &params.reward_permill.to_be_bytes(),
        &params.lock_period.to_be_bytes(),
        &params.max_total_staked.to_be_bytes(),
    ])
}

/// floor(amount * permill / 1000), rejecting overflow.
pub fn reward_for(amount: Amount, permill: u32) -> Result<Amount, LockstepError> {
    amount
        .checked_mul(permill as Amount)
        .map(|scaled| scaled / PERMILL_DENOMINATOR)
        .ok_or(LockstepError::Overflow)
}

// crates/lockstep-staking/src/ledger.rs
//
// Staking ledger: pools, per-account staking positions, and the two running
// totals that mirror the ledger's token custody.
//
// Invariants:
//   staked_and_rewards == sum of total_amount over all open positions
//   total_free_rewards  == rewards reserved by pools, not yet handed to a
//                          position and not yet reclaimed
//   custody balance     >= staked_and_rewards + total_free_rewards
//
// Positions are kept in an unordered list per account and removed with
// swap_remove, so indices are not stable across withdrawals.

use std::collections::{BTreeMap, BTreeSet};

use lockstep_core::recovery::sweep;
use lockstep_core::{
    Address, Amount, Context, LedgerEvent, LockstepError, Ownable, RecoverAsset, StakeBridge,
    Timestamp,
};

use crate::pool::{reward_for, PoolHash, PoolParams, StakingPool};
use crate::position::StakingPosition;

/// Most open staking positions a single account may hold. Bounds the cost
/// of scanning an account's positions on withdrawal.
pub const MAX_STAKES_PER_ACCOUNT: usize = 10;

/// A deposit that passed every admission check, ready to be recorded.
#[derive(Debug, Clone, Copy)]
struct Admission {
    account: Address,
    pool_id: usize,
    pool_hash: PoolHash,
    amount: Amount,
    reward: Amount,
    total: Amount,
    end_time: Timestamp,
    /// Account's lifetime principal in the pool after this deposit.
    cumulative: Amount,
    pool_total: Amount,
    owed: Amount,
}

/// The staking ledger.
#[derive(Debug, Clone)]
pub struct StakingLedger {
    address: Address,
    owner: Ownable,
    /// The only caller allowed to use the claim-to-stake bridge.
    vesting_address: Address,
    pools: Vec<StakingPool>,
    /// Sequence number handed to the next pool; never decreases.
    next_pool_seq: u64,
    stakes: BTreeMap<Address, Vec<StakingPosition>>,
    /// Lifetime principal per account per pool, keyed by pool hash.
    staked_in_pool: BTreeMap<(Address, PoolHash), Amount>,
    staked_and_rewards: Amount,
    total_free_rewards: Amount,
}

impl StakingLedger {
    /// Create an empty ledger with custody account `address`, accepting
    /// bridge deposits from `vesting_address`.
    pub fn new(address: Address, owner: Address, vesting_address: Address) -> Self {
        Self {
            address,
            owner: Ownable::new(owner),
            vesting_address,
            pools: Vec::new(),
            next_pool_seq: 0,
            stakes: BTreeMap::new(),
            staked_in_pool: BTreeMap::new(),
            staked_and_rewards: 0,
            total_free_rewards: 0,
        }
    }

    // -----------------------------------------------------------------
    // Owner operations
    // -----------------------------------------------------------------

    /// Open a new pool and pull its full reward reserve from the caller.
    ///
    /// The reserve is `max_total_staked * reward_permill / 1000`, enough to
    /// reward deposits up to the pool's capacity. Returns the pool index.
    ///
    /// # Errors
    /// `Unauthorized` for non-owners, `InvalidArgument` for inconsistent
    /// parameters, `TokenTransfer` if the reserve cannot be pulled.
    pub fn add_stake_pool(
        &mut self,
        ctx: &mut Context<'_>,
        params: PoolParams,
    ) -> Result<usize, LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        params.validate(ctx.now)?;

        let reserve = reward_for(params.max_total_staked, params.reward_permill)?;
        let free = self
            .total_free_rewards
            .checked_add(reserve)
            .ok_or(LockstepError::Overflow)?;
        let seq = self.next_pool_seq;
        let next_seq = seq.checked_add(1).ok_or(LockstepError::Overflow)?;

        let funder = ctx.caller;
        ctx.pull_tokens(&self.address, &funder, &self.address, reserve)?;

        let pool = StakingPool::new(params, seq);
        let pool_id = self.pools.len();
        ctx.emit(LedgerEvent::PoolAdded {
            pool_id,
            pool_hash: pool.pool_hash,
            max_total_staked: params.max_total_staked,
            reserved_rewards: reserve,
        });
        self.pools.push(pool);
        self.next_pool_seq = next_seq;
        self.total_free_rewards = free;
        Ok(pool_id)
    }

    /// Return the reward reserve of every pool whose entry window has
    /// closed and drop those pools from the pool list.
    ///
    /// Pools still accepting deposits (or not yet open) are left alone.
    /// Remaining pools may change index. Per-account stake records of the
    /// dropped pools go with them; open positions are untouched.
    ///
    /// # Errors
    /// `NothingToRecover` if no closed pool has unfilled reward.
    pub fn reclaim_rewards(&mut self, ctx: &mut Context<'_>) -> Result<Amount, LockstepError> {
        self.owner.require_owner(&ctx.caller)?;

        let mut reclaimed: Amount = 0;
        let mut closed = 0usize;
        for pool in self.pools.iter().filter(|p| p.is_closed(ctx.now)) {
            reclaimed = reclaimed
                .checked_add(pool.unfilled_reward()?)
                .ok_or(LockstepError::Overflow)?;
            closed += 1;
        }
        if reclaimed == 0 {
            return Err(LockstepError::NothingToRecover);
        }
        let free = self.total_free_rewards.checked_sub(reclaimed).ok_or_else(|| {
            LockstepError::InvariantViolated(format!(
                "reclaiming {} exceeds free rewards {}",
                reclaimed, self.total_free_rewards
            ))
        })?;

        let owner = self.owner.owner();
        ctx.push_tokens(&self.address, &owner, reclaimed)?;

        let now = ctx.now;
        let mut dropped = BTreeSet::new();
        let mut i = 0;
        while i < self.pools.len() {
            if self.pools[i].is_closed(now) {
                dropped.insert(self.pools.swap_remove(i).pool_hash);
            } else {
                i += 1;
            }
        }
        self.staked_in_pool.retain(|(_, hash), _| !dropped.contains(hash));
        self.total_free_rewards = free;
        ctx.emit(LedgerEvent::RewardsReclaimed {
            amount: reclaimed,
            pools_closed: closed,
        });
        self.debug_check();
        Ok(reclaimed)
    }

    /// Sweep funds this ledger does not owe anyone to the owner.
    ///
    /// For the managed token, open positions and unspent reward reserves
    /// are held back first.
    pub fn recover(
        &mut self,
        ctx: &mut Context<'_>,
        asset: RecoverAsset<'_>,
        amount: Amount,
    ) -> Result<Amount, LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        let committed = self
            .staked_and_rewards
            .checked_add(self.total_free_rewards)
            .ok_or(LockstepError::Overflow)?;
        let owner = self.owner.owner();
        sweep(ctx, &self.address, &owner, asset, amount, committed)
    }

    /// Hand ownership of this ledger to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut Context<'_>,
        new_owner: Address,
    ) -> Result<(), LockstepError> {
        let event = self.owner.transfer_ownership(&ctx.caller, new_owner)?;
        ctx.emit(event);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Deposits and withdrawals
    // -----------------------------------------------------------------

    /// Stake `amount` of the caller's tokens in pool `pool_id`.
    ///
    /// Only the principal is pulled from the caller; the reward comes out of
    /// the pool's pre-funded reserve. Returns the new position.
    ///
    /// # Errors
    /// - `IndexOutOfRange` for an unknown pool.
    /// - `PositionLimit` if the caller already holds the maximum.
    /// - `CapacityExceeded` if the caller's cumulative stake in the pool
    ///   would leave `[min_stake, max_stake]`, or the pool would overfill.
    /// - `PoolClosed` outside the entry window.
    /// - `TokenTransfer` if the principal cannot be pulled.
    pub fn deposit(
        &mut self,
        ctx: &mut Context<'_>,
        pool_id: usize,
        amount: Amount,
    ) -> Result<StakingPosition, LockstepError> {
        let account = ctx.caller;
        let admission = self.admit(&account, pool_id, amount, ctx.now)?;
        ctx.pull_tokens(&self.address, &account, &self.address, amount)?;
        Ok(self.record(ctx, admission))
    }

    /// Withdraw every matured position of the caller.
    ///
    /// # Errors
    /// `NoLocks` without positions, `NothingToClaim` if none has matured.
    pub fn claim(&mut self, ctx: &mut Context<'_>) -> Result<Amount, LockstepError> {
        let account = ctx.caller;
        let now = ctx.now;
        let positions = self.stakes(&account);
        if positions.is_empty() {
            return Err(LockstepError::NoLocks);
        }
        let payout: Amount = positions
            .iter()
            .filter(|p| p.is_mature(now))
            .map(|p| p.total_amount)
            .sum();
        if payout == 0 {
            return Err(LockstepError::NothingToClaim);
        }
        let remaining = self.owed_after(payout)?;

        ctx.push_tokens(&self.address, &account, payout)?;

        if let Some(positions) = self.stakes.get_mut(&account) {
            let mut i = 0;
            while i < positions.len() {
                if positions[i].is_mature(now) {
                    positions.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }
        self.finish_withdrawal(ctx, account, payout, remaining);
        Ok(payout)
    }

    /// Withdraw the caller's position at `index`, if it has matured.
    ///
    /// The last position takes its place, so other indices may change.
    pub fn claim_stake(
        &mut self,
        ctx: &mut Context<'_>,
        index: usize,
    ) -> Result<Amount, LockstepError> {
        let account = ctx.caller;
        let position = self.stake(&account, index)?;
        if !position.is_mature(ctx.now) {
            return Err(LockstepError::NothingToClaim);
        }
        let payout = position.total_amount;
        let remaining = self.owed_after(payout)?;

        ctx.push_tokens(&self.address, &account, payout)?;

        if let Some(positions) = self.stakes.get_mut(&account) {
            positions.swap_remove(index);
        }
        self.finish_withdrawal(ctx, account, payout, remaining);
        Ok(payout)
    }

    // -----------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------

    /// Custody address of this ledger.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner.owner()
    }

    /// The vesting ledger allowed to stake on behalf of accounts.
    pub fn vesting_address(&self) -> Address {
        self.vesting_address
    }

    /// Active pools. Closed pools disappear after `reclaim_rewards`.
    pub fn pools(&self) -> &[StakingPool] {
        &self.pools
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, pool_id: usize) -> Result<&StakingPool, LockstepError> {
        self.pools.get(pool_id).ok_or(LockstepError::IndexOutOfRange {
            index: pool_id,
            len: self.pools.len(),
        })
    }

    /// Open positions of `account`, in no particular order.
    pub fn stakes(&self, account: &Address) -> &[StakingPosition] {
        self.stakes.get(account).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn stake_count(&self, account: &Address) -> usize {
        self.stakes(account).len()
    }

    pub fn stake(
        &self,
        account: &Address,
        index: usize,
    ) -> Result<&StakingPosition, LockstepError> {
        let positions = self.stakes(account);
        positions.get(index).ok_or(LockstepError::IndexOutOfRange {
            index,
            len: positions.len(),
        })
    }

    /// Lifetime principal `account` has put into pool `pool_id`.
    pub fn staked_in_pool(
        &self,
        account: &Address,
        pool_id: usize,
    ) -> Result<Amount, LockstepError> {
        let pool = self.pool(pool_id)?;
        Ok(self
            .staked_in_pool
            .get(&(*account, pool.pool_hash))
            .copied()
            .unwrap_or(0))
    }

    /// Principal plus reward of `account`'s matured positions at `now`.
    pub fn claimable(&self, account: &Address, now: Timestamp) -> Amount {
        self.stakes(account)
            .iter()
            .filter(|p| p.is_mature(now))
            .map(|p| p.total_amount)
            .sum()
    }

    /// Principal plus reward of all `account`'s positions, matured or not.
    pub fn staked_with_rewards(&self, account: &Address) -> Amount {
        self.stakes(account).iter().map(|p| p.total_amount).sum()
    }

    /// Tokens owed to open positions.
    pub fn staked_and_rewards(&self) -> Amount {
        self.staked_and_rewards
    }

    /// Reward reserve not yet assigned to a position.
    pub fn total_free_rewards(&self) -> Amount {
        self.total_free_rewards
    }

    /// Recompute `staked_and_rewards` from the positions and compare with
    /// the running total; also checks the per-account position cap.
    pub fn check_invariants(&self) -> Result<(), LockstepError> {
        let mut owed: Amount = 0;
        for (account, positions) in &self.stakes {
            if positions.len() > MAX_STAKES_PER_ACCOUNT {
                return Err(LockstepError::InvariantViolated(format!(
                    "{} holds {} positions",
                    account.short(),
                    positions.len()
                )));
            }
            for p in positions {
                owed = owed
                    .checked_add(p.total_amount)
                    .ok_or(LockstepError::Overflow)?;
            }
        }
        if owed != self.staked_and_rewards {
            return Err(LockstepError::InvariantViolated(format!(
                "staked_and_rewards is {} but positions hold {}",
                self.staked_and_rewards, owed
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Run every admission check for a deposit without changing anything.
    fn admit(
        &self,
        account: &Address,
        pool_id: usize,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Admission, LockstepError> {
        let pool = self.pool(pool_id)?;
        let params = &pool.params;
        if amount == 0 {
            return Err(LockstepError::InvalidArgument(
                "deposit amount must be positive".to_string(),
            ));
        }
        if self.stake_count(account) >= MAX_STAKES_PER_ACCOUNT {
            return Err(LockstepError::PositionLimit {
                limit: MAX_STAKES_PER_ACCOUNT,
            });
        }

        let already = self
            .staked_in_pool
            .get(&(*account, pool.pool_hash))
            .copied()
            .unwrap_or(0);
        let cumulative = already.checked_add(amount).ok_or(LockstepError::Overflow)?;
        if cumulative > params.max_stake {
            return Err(LockstepError::CapacityExceeded(format!(
                "stake of {} in pool {} would exceed max stake {}",
                cumulative, pool_id, params.max_stake
            )));
        }
        if cumulative < params.min_stake {
            return Err(LockstepError::CapacityExceeded(format!(
                "stake of {} in pool {} is below min stake {}",
                cumulative, pool_id, params.min_stake
            )));
        }

        let reward = reward_for(amount, params.reward_permill)?;
        let total = amount.checked_add(reward).ok_or(LockstepError::Overflow)?;
        let pool_total = pool
            .total_staked
            .checked_add(total)
            .ok_or(LockstepError::Overflow)?;
        if pool_total > params.max_total_staked {
            return Err(LockstepError::CapacityExceeded(format!(
                "pool {} would hold {} of {}",
                pool_id, pool_total, params.max_total_staked
            )));
        }
        if !pool.is_open(now) {
            return Err(LockstepError::PoolClosed {
                now,
                start: params.start_time,
                end: params.end_time,
            });
        }
        if reward > self.total_free_rewards {
            return Err(LockstepError::InvariantViolated(format!(
                "reward {} exceeds free rewards {}",
                reward, self.total_free_rewards
            )));
        }
        let end_time = now
            .checked_add(params.lock_period)
            .ok_or(LockstepError::Overflow)?;
        let owed = self
            .staked_and_rewards
            .checked_add(total)
            .ok_or(LockstepError::Overflow)?;

        Ok(Admission {
            account: *account,
            pool_id,
            pool_hash: pool.pool_hash,
            amount,
            reward,
            total,
            end_time,
            cumulative,
            pool_total,
            owed,
        })
    }

    /// Write an admitted deposit into the books. Cannot fail: every sum
    /// was computed and checked by `admit`.
    fn record(&mut self, ctx: &mut Context<'_>, a: Admission) -> StakingPosition {
        let position = StakingPosition {
            pool_hash: a.pool_hash,
            amount: a.amount,
            reward: a.reward,
            total_amount: a.total,
            end_time: a.end_time,
        };
        self.pools[a.pool_id].total_staked = a.pool_total;
        self.staked_in_pool.insert((a.account, a.pool_hash), a.cumulative);
        self.total_free_rewards -= a.reward;
        self.staked_and_rewards = a.owed;
        self.stakes
            .entry(a.account)
            .or_default()
            .push(position.clone());

        ctx.emit(LedgerEvent::Deposit {
            account: a.account,
            pool_id: a.pool_id,
            amount: a.amount,
            end_time: a.end_time,
        });
        self.debug_check();
        position
    }

    fn owed_after(&self, payout: Amount) -> Result<Amount, LockstepError> {
        self.staked_and_rewards.checked_sub(payout).ok_or_else(|| {
            LockstepError::InvariantViolated(format!(
                "payout {} exceeds staked_and_rewards {}",
                payout, self.staked_and_rewards
            ))
        })
    }

    fn finish_withdrawal(
        &mut self,
        ctx: &mut Context<'_>,
        account: Address,
        payout: Amount,
        remaining: Amount,
    ) {
        if self.stakes.get(&account).is_some_and(|v| v.is_empty()) {
            self.stakes.remove(&account);
        }
        self.staked_and_rewards = remaining;
        ctx.emit(LedgerEvent::Withdraw {
            account,
            amount: payout,
        });
        self.debug_check();
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "staking invariants violated: {:?}",
            self.check_invariants()
        );
    }
}

impl StakeBridge for StakingLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn vesting_address(&self) -> Address {
        self.vesting_address
    }

    /// Open a position for `account` funded from the vesting ledger's
    /// custody. Only the vesting ledger may call this.
    ///
    /// Admission failures and a refused pull come back as `Ok(false)` with
    /// nothing changed; a foreign caller is an error.
    fn claim_to_stake(
        &mut self,
        ctx: &mut Context<'_>,
        account: &Address,
        pool_index: usize,
        amount: Amount,
    ) -> Result<bool, LockstepError> {
        if ctx.caller != self.vesting_address {
            return Err(LockstepError::Unauthorized(format!(
                "{} is not the vesting ledger",
                ctx.caller.short()
            )));
        }
        let admission = match self.admit(account, pool_index, amount, ctx.now) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(
                    account = %account.short(),
                    pool_index,
                    "Bridge deposit refused: {}",
                    e
                );
                return Ok(false);
            }
        };
        let vesting = self.vesting_address;
        if let Err(e) = ctx.pull_tokens(&self.address, &vesting, &self.address, amount) {
            tracing::warn!(
                account = %account.short(),
                pool_index,
                "Bridge pull refused: {}",
                e
            );
            return Ok(false);
        }
        self.record(ctx, admission);
        Ok(true)
    }
}

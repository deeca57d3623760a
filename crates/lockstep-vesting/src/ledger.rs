// crates/lockstep-vesting/src/ledger.rs
//
// Vesting ledger: per-account vesting positions and the running `vested`
// total that mirrors the ledger's token custody.
//
// Invariant: `vested` == sum over every position of (total_tokens - claimed),
// and the ledger's managed-token balance always covers `vested`.
//
// Claims are computed first, paid second, and only then written back, so a
// failed payout never leaves a position marked as claimed.

use std::collections::BTreeMap;

use lockstep_core::{
    Address, Amount, Context, LedgerEvent, LockstepError, Ownable, Timestamp,
};

use crate::curve::claimable_amount;
use crate::position::VestingPosition;

/// A vesting grant as requested by the owner, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VestGrant {
    pub account: Address,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub start_tokens: Amount,
    pub total_tokens: Amount,
}

/// What a claim would release, per position index.
#[derive(Debug, Default)]
pub(crate) struct ReleasePlan {
    pub parts: Vec<(usize, Amount)>,
    pub total: Amount,
}

/// The vesting ledger.
#[derive(Debug, Clone)]
pub struct VestingLedger {
    /// Custody address of this ledger in the token ledger.
    pub(crate) address: Address,
    pub(crate) owner: Ownable,
    pub(crate) vestings: BTreeMap<Address, Vec<VestingPosition>>,
    /// Sum of unclaimed tokens across all positions.
    pub(crate) vested: Amount,
    /// Staking ledger bound through `set_stake_address`, once set.
    pub(crate) stake_address: Option<Address>,
}

impl VestingLedger {
    /// Create an empty ledger whose custody account is `address`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner: Ownable::new(owner),
            vestings: BTreeMap::new(),
            vested: 0,
            stake_address: None,
        }
    }

    // -----------------------------------------------------------------
    // Owner operations
    // -----------------------------------------------------------------

    /// Grant one vesting position to `account`, funded from the caller.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not the owner.
    /// - `InvalidArgument` for a null or contract account, a start date not
    ///   in the future, an end date before the start, or a total that does
    ///   not exceed the cliff amount.
    /// - `TokenTransfer` if the caller's balance or allowance is too low.
    pub fn create_vest(
        &mut self,
        ctx: &mut Context<'_>,
        account: Address,
        start_date: Timestamp,
        end_date: Timestamp,
        start_tokens: Amount,
        total_tokens: Amount,
    ) -> Result<(), LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        let grant = VestGrant {
            account,
            start_date,
            end_date,
            start_tokens,
            total_tokens,
        };
        validate_grant(ctx, &grant)?;
        let vested = self
            .vested
            .checked_add(total_tokens)
            .ok_or(LockstepError::Overflow)?;

        let funder = ctx.caller;
        ctx.pull_tokens(&self.address, &funder, &self.address, total_tokens)?;

        self.vested = vested;
        self.add_position(ctx, grant);
        self.debug_check();
        Ok(())
    }

    /// Grant many vesting positions in one operation with a single pull of
    /// their combined total.
    ///
    /// All five slices must have the same, non-zero length. Every entry is
    /// validated before anything is written; one bad entry rejects the batch.
    pub fn mass_create_vest(
        &mut self,
        ctx: &mut Context<'_>,
        accounts: &[Address],
        start_dates: &[Timestamp],
        end_dates: &[Timestamp],
        start_tokens: &[Amount],
        total_tokens: &[Amount],
    ) -> Result<(), LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        let len = accounts.len();
        if start_dates.len() != len
            || end_dates.len() != len
            || start_tokens.len() != len
            || total_tokens.len() != len
        {
            return Err(LockstepError::LengthMismatch);
        }
        if len == 0 {
            return Err(LockstepError::InvalidArgument(
                "no vesting entries given".to_string(),
            ));
        }

        let mut grants = Vec::with_capacity(len);
        let mut sum: Amount = 0;
        for i in 0..len {
            let grant = VestGrant {
                account: accounts[i],
                start_date: start_dates[i],
                end_date: end_dates[i],
                start_tokens: start_tokens[i],
                total_tokens: total_tokens[i],
            };
            validate_grant(ctx, &grant)?;
            sum = sum
                .checked_add(grant.total_tokens)
                .ok_or(LockstepError::Overflow)?;
            grants.push(grant);
        }
        let vested = self.vested.checked_add(sum).ok_or(LockstepError::Overflow)?;

        let funder = ctx.caller;
        ctx.pull_tokens(&self.address, &funder, &self.address, sum)?;

        self.vested = vested;
        for grant in grants {
            self.add_position(ctx, grant);
        }
        tracing::info!(entries = len, total = sum, "Mass vesting created");
        self.debug_check();
        Ok(())
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
    // Claims
    // -----------------------------------------------------------------

    /// Claim everything the caller has unlocked, paid to the caller.
    pub fn claim(&mut self, ctx: &mut Context<'_>) -> Result<Amount, LockstepError> {
        let account = ctx.caller;
        self.claim_for(ctx, account)
    }

    /// Claim everything `account` has unlocked, paid to `account`.
    ///
    /// Anyone may call this; the funds only ever go to `account`.
    ///
    /// # Errors
    /// `NoLocks` if `account` has no positions, `NothingToClaim` if nothing
    /// has unlocked since the last claim.
    pub fn claim_for(
        &mut self,
        ctx: &mut Context<'_>,
        account: Address,
    ) -> Result<Amount, LockstepError> {
        let plan = self.plan_release(&account, ctx.now)?;
        self.pay_out(ctx, account, plan)
    }

    /// Claim a single position of `account`, paid to `account`.
    ///
    /// # Errors
    /// `IndexOutOfRange` for a bad index, otherwise as `claim_for`.
    pub fn claim_one_for(
        &mut self,
        ctx: &mut Context<'_>,
        account: Address,
        index: usize,
    ) -> Result<Amount, LockstepError> {
        let plan = self.plan_release_one(&account, index, ctx.now)?;
        self.pay_out(ctx, account, plan)
    }

    /// Compatibility alias for `claim`, for wallets that only offer a
    /// "transfer" button on this ledger's locked balance.
    ///
    /// Both arguments are ignored: this never sends tokens to `_to` and never
    /// moves `_amount`. It claims the caller's own unlocked tokens to the
    /// caller, exactly like `claim`.
    pub fn transfer(
        &mut self,
        ctx: &mut Context<'_>,
        _to: Address,
        _amount: Amount,
    ) -> Result<Amount, LockstepError> {
        tracing::debug!(caller = %ctx.caller.short(), "transfer() treated as claim()");
        self.claim(ctx)
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

    /// Staking ledger this ledger is bound to, if any.
    pub fn stake_address(&self) -> Option<Address> {
        self.stake_address
    }

    /// Unclaimed tokens across all accounts.
    pub fn vested(&self) -> Amount {
        self.vested
    }

    /// Sum of what `account` could claim at `now`.
    pub fn claimable(&self, account: &Address, now: Timestamp) -> Amount {
        self.get_vestings(account)
            .iter()
            .map(|p| claimable_amount(p, now))
            .sum()
    }

    /// Locked balance of `account`: unclaimed tokens, unlocked or not.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.get_vestings(account).iter().map(|p| p.locked()).sum()
    }

    /// All positions of `account`, in creation order.
    pub fn get_vestings(&self, account: &Address) -> &[VestingPosition] {
        self.vestings
            .get(account)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of positions of `account`.
    pub fn get_vesting_count(&self, account: &Address) -> usize {
        self.get_vestings(account).len()
    }

    /// One position of `account`.
    pub fn get_vesting(
        &self,
        account: &Address,
        index: usize,
    ) -> Result<&VestingPosition, LockstepError> {
        let positions = self.get_vestings(account);
        positions.get(index).ok_or(LockstepError::IndexOutOfRange {
            index,
            len: positions.len(),
        })
    }

    /// Recompute `vested` from the positions and compare with the running
    /// total. Also checks every position's `claimed` bound.
    pub fn check_invariants(&self) -> Result<(), LockstepError> {
        let mut outstanding: Amount = 0;
        for (account, positions) in &self.vestings {
            for (i, p) in positions.iter().enumerate() {
                if p.claimed > p.total_tokens {
                    return Err(LockstepError::InvariantViolated(format!(
                        "position {} of {} claimed {} of {}",
                        i,
                        account.short(),
                        p.claimed,
                        p.total_tokens
                    )));
                }
                outstanding = outstanding
                    .checked_add(p.locked())
                    .ok_or(LockstepError::Overflow)?;
            }
        }
        if outstanding != self.vested {
            return Err(LockstepError::InvariantViolated(format!(
                "vested is {} but positions hold {}",
                self.vested, outstanding
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn add_position(&mut self, ctx: &mut Context<'_>, grant: VestGrant) {
        self.vestings
            .entry(grant.account)
            .or_default()
            .push(VestingPosition::new(
                grant.start_date,
                grant.end_date,
                grant.start_tokens,
                grant.total_tokens,
            ));
        ctx.emit(LedgerEvent::VestAdded {
            account: grant.account,
            start_date: grant.start_date,
            end_date: grant.end_date,
            start_tokens: grant.start_tokens,
            total_tokens: grant.total_tokens,
        });
    }

    /// Work out what every position of `account` would release at `now`.
    /// Does not modify anything.
    pub(crate) fn plan_release(
        &self,
        account: &Address,
        now: Timestamp,
    ) -> Result<ReleasePlan, LockstepError> {
        let positions = self.get_vestings(account);
        if positions.is_empty() {
            return Err(LockstepError::NoLocks);
        }
        let mut plan = ReleasePlan::default();
        for (i, p) in positions.iter().enumerate() {
            let amount = claimable_amount(p, now);
            if amount > 0 {
                plan.parts.push((i, amount));
                plan.total += amount;
            }
        }
        if plan.total == 0 {
            return Err(LockstepError::NothingToClaim);
        }
        tracing::debug!(account = %account.short(), total = plan.total, "Planned release");
        Ok(plan)
    }

    fn plan_release_one(
        &self,
        account: &Address,
        index: usize,
        now: Timestamp,
    ) -> Result<ReleasePlan, LockstepError> {
        let positions = self.get_vestings(account);
        if positions.is_empty() {
            return Err(LockstepError::NoLocks);
        }
        let position = self.get_vesting(account, index)?;
        let amount = claimable_amount(position, now);
        if amount == 0 {
            return Err(LockstepError::NothingToClaim);
        }
        Ok(ReleasePlan {
            parts: vec![(index, amount)],
            total: amount,
        })
    }

    /// Write a release plan back: bump `claimed` on each position and take
    /// the total off `vested`.
    pub(crate) fn apply_release(
        &mut self,
        account: &Address,
        plan: &ReleasePlan,
    ) -> Result<(), LockstepError> {
        let vested = self.vested.checked_sub(plan.total).ok_or_else(|| {
            LockstepError::InvariantViolated(format!(
                "release of {} exceeds vested {}",
                plan.total, self.vested
            ))
        })?;
        let positions = self
            .vestings
            .get_mut(account)
            .ok_or(LockstepError::NoLocks)?;
        let len = positions.len();
        for &(index, amount) in &plan.parts {
            let position = positions
                .get_mut(index)
                .ok_or(LockstepError::IndexOutOfRange { index, len })?;
            position.claimed += amount;
        }
        self.vested = vested;
        Ok(())
    }

    fn pay_out(
        &mut self,
        ctx: &mut Context<'_>,
        account: Address,
        plan: ReleasePlan,
    ) -> Result<Amount, LockstepError> {
        ctx.push_tokens(&self.address, &account, plan.total)?;
        self.apply_release(&account, &plan)?;
        ctx.emit(LedgerEvent::Claimed {
            account,
            amount: plan.total,
        });
        self.debug_check();
        Ok(plan.total)
    }

    pub(crate) fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "vesting invariants violated: {:?}",
            self.check_invariants()
        );
    }
}

fn validate_grant(ctx: &Context<'_>, grant: &VestGrant) -> Result<(), LockstepError> {
    if grant.account.is_zero() {
        return Err(LockstepError::InvalidArgument(
            "vesting account is the zero address".to_string(),
        ));
    }
    if ctx.is_contract(&grant.account) {
        return Err(LockstepError::InvalidArgument(format!(
            "vesting account {} is a contract",
            grant.account.short()
        )));
    }
    if grant.start_date <= ctx.now {
        return Err(LockstepError::InvalidArgument(format!(
            "start date {} is not in the future (now {})",
            grant.start_date, ctx.now
        )));
    }
    if grant.end_date < grant.start_date {
        return Err(LockstepError::InvalidArgument(format!(
            "end date {} is before start date {}",
            grant.end_date, grant.start_date
        )));
    }
    if grant.total_tokens <= grant.start_tokens {
        return Err(LockstepError::InvalidArgument(format!(
            "total tokens {} must exceed start tokens {}",
            grant.total_tokens, grant.start_tokens
        )));
    }
    Ok(())
}

// crates/lockstep-vesting/src/bridge.rs
//
// Vesting side of the claim-to-stake bridge.
//
// Binding is a one-time handshake: the staking ledger must already name
// this ledger as its vesting ledger, and only then does this ledger record
// the staking address and give it an unlimited allowance over its custody.
// After that, an account can turn its unlocked vesting tokens directly into
// a staking position instead of receiving them.

use lockstep_core::{
    Address, Amount, Context, LedgerEvent, LockstepError, StakeBridge,
};

use crate::ledger::VestingLedger;

impl VestingLedger {
    /// Bind this ledger to `staking`. Owner only, settable exactly once.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not the owner.
    /// - `BridgeAlreadySet` on any second call.
    /// - `InvalidArgument` if `staking` does not point back at this ledger.
    pub fn set_stake_address(
        &mut self,
        ctx: &mut Context<'_>,
        staking: &dyn StakeBridge,
    ) -> Result<(), LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        if self.stake_address.is_some() {
            return Err(LockstepError::BridgeAlreadySet);
        }
        let stake_address = staking.address();
        if staking.vesting_address() != self.address {
            return Err(LockstepError::InvalidArgument(format!(
                "staking ledger {} is bound to vesting ledger {}, not {}",
                stake_address.short(),
                staking.vesting_address().short(),
                self.address.short()
            )));
        }

        ctx.approve(&self.address, &stake_address, Amount::MAX)?;
        self.stake_address = Some(stake_address);
        ctx.emit(LedgerEvent::StakeAddressSet { stake_address });
        Ok(())
    }

    /// Stake everything the caller has unlocked into pool `pool_index`.
    ///
    /// The claim is computed exactly as `claim` computes it, but instead of
    /// paying the caller, the staking ledger pulls the amount from this
    /// ledger's custody and opens a position for the caller. The positions'
    /// `claimed` fields are only written once the staking ledger accepted
    /// the deposit.
    ///
    /// # Errors
    /// - `BridgeNotSet` before `set_stake_address`.
    /// - `Unauthorized` if `staking` is not the bound staking ledger.
    /// - `NoLocks` / `NothingToClaim` as for `claim`.
    /// - `StakeRefused` if the staking ledger declines the deposit, or any
    ///   error the staking ledger raises.
    pub fn claim_to_stake(
        &mut self,
        ctx: &mut Context<'_>,
        staking: &mut dyn StakeBridge,
        pool_index: usize,
    ) -> Result<Amount, LockstepError> {
        let stake_address = self.stake_address.ok_or(LockstepError::BridgeNotSet)?;
        if staking.address() != stake_address {
            return Err(LockstepError::Unauthorized(format!(
                "{} is not the bound staking ledger",
                staking.address().short()
            )));
        }

        let account: Address = ctx.caller;
        let plan = self.plan_release(&account, ctx.now)?;

        let accepted = {
            let mut nested = ctx.nested(self.address);
            staking.claim_to_stake(&mut nested, &account, pool_index, plan.total)?
        };
        if !accepted {
            return Err(LockstepError::StakeRefused(format!(
                "pool {} refused {} from {}",
                pool_index,
                plan.total,
                account.short()
            )));
        }

        self.apply_release(&account, &plan)?;
        ctx.emit(LedgerEvent::Claimed {
            account,
            amount: plan.total,
        });
        tracing::info!(
            account = %account.short(),
            pool_index,
            amount = plan.total,
            "Vested tokens staked"
        );
        self.debug_check();
        Ok(plan.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::{ContractRegistry, InMemoryToken, TokenLedger, Timestamp};

    const NOW: Timestamp = 1_000;

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn vesting_address() -> Address {
        Address::from_label("vesting")
    }

    /// Staking stand-in that records what it was asked to do.
    struct FakeStaking {
        address: Address,
        points_at: Address,
        accept: bool,
        received: Vec<(Address, Address, usize, Amount)>,
    }

    impl StakeBridge for FakeStaking {
        fn address(&self) -> Address {
            self.address
        }

        fn vesting_address(&self) -> Address {
            self.points_at
        }

        fn claim_to_stake(
            &mut self,
            ctx: &mut Context<'_>,
            account: &Address,
            pool_index: usize,
            amount: Amount,
        ) -> Result<bool, LockstepError> {
            if !self.accept {
                return Ok(false);
            }
            let me = self.address;
            let from = ctx.caller;
            ctx.pull_tokens(&me, &from, &me, amount)?;
            self.received.push((ctx.caller, *account, pool_index, amount));
            Ok(true)
        }
    }

    fn fake(accept: bool) -> FakeStaking {
        FakeStaking {
            address: Address::from_label("staking"),
            points_at: vesting_address(),
            accept,
            received: Vec::new(),
        }
    }

    fn setup() -> (InMemoryToken, ContractRegistry, VestingLedger) {
        let mut token = InMemoryToken::new("LOCK");
        token.mint(&owner(), 100);
        token.approve(&owner(), &vesting_address(), Amount::MAX);
        (token, ContractRegistry::new(), VestingLedger::new(vesting_address(), owner()))
    }

    #[test]
    fn test_set_stake_address_once() {
        let (mut token, accounts, mut ledger) = setup();
        let staking = fake(true);
        let mut events = Vec::new();
        let mut ctx = Context::new(owner(), NOW, &mut token, &accounts, &mut events);

        ledger.set_stake_address(&mut ctx, &staking).unwrap();
        assert_eq!(
            ledger.set_stake_address(&mut ctx, &staking),
            Err(LockstepError::BridgeAlreadySet)
        );
        assert_eq!(ledger.stake_address(), Some(staking.address));
        assert_eq!(token.allowance(&vesting_address(), &staking.address), Amount::MAX);
    }

    #[test]
    fn test_set_stake_address_requires_back_reference() {
        let (mut token, accounts, mut ledger) = setup();
        let mut staking = fake(true);
        staking.points_at = Address::from_label("someone-else");
        let mut events = Vec::new();
        let mut ctx = Context::new(owner(), NOW, &mut token, &accounts, &mut events);

        let result = ledger.set_stake_address(&mut ctx, &staking);
        assert!(matches!(result, Err(LockstepError::InvalidArgument(_))));
        assert_eq!(ledger.stake_address(), None);
    }

    #[test]
    fn test_claim_to_stake_moves_custody() {
        let (mut token, accounts, mut ledger) = setup();
        let mut staking = fake(true);
        let mut events = Vec::new();
        {
            let mut ctx = Context::new(owner(), NOW, &mut token, &accounts, &mut events);
            ledger.set_stake_address(&mut ctx, &staking).unwrap();
            ledger.create_vest(&mut ctx, alice(), NOW + 1, NOW + 2, 0, 40).unwrap();
        }
        let mut ctx = Context::new(alice(), NOW + 5, &mut token, &accounts, &mut events);
        let staked = ledger.claim_to_stake(&mut ctx, &mut staking, 3).unwrap();

        assert_eq!(staked, 40);
        assert_eq!(staking.received, vec![(vesting_address(), alice(), 3, 40)]);
        assert_eq!(ledger.vested(), 0);
        assert_eq!(token.balance_of(&staking.address), 40);
        assert_eq!(token.balance_of(&alice()), 0);
    }

    #[test]
    fn test_refused_stake_keeps_position_unclaimed() {
        let (mut token, accounts, mut ledger) = setup();
        let mut staking = fake(false);
        let mut events = Vec::new();
        {
            let mut ctx = Context::new(owner(), NOW, &mut token, &accounts, &mut events);
            ledger.set_stake_address(&mut ctx, &staking).unwrap();
            ledger.create_vest(&mut ctx, alice(), NOW + 1, NOW + 2, 0, 40).unwrap();
        }
        let mut ctx = Context::new(alice(), NOW + 5, &mut token, &accounts, &mut events);
        let result = ledger.claim_to_stake(&mut ctx, &mut staking, 0);

        assert!(matches!(result, Err(LockstepError::StakeRefused(_))));
        assert_eq!(ledger.vested(), 40);
        assert_eq!(ledger.claimable(&alice(), NOW + 5), 40);
    }

    #[test]
    fn test_claim_to_stake_without_binding() {
        let (mut token, accounts, mut ledger) = setup();
        let mut staking = fake(true);
        let mut events = Vec::new();
        let mut ctx = Context::new(alice(), NOW, &mut token, &accounts, &mut events);
        assert_eq!(
            ledger.claim_to_stake(&mut ctx, &mut staking, 0),
            Err(LockstepError::BridgeNotSet)
        );
    }

    #[test]
    fn test_claim_to_stake_nothing_to_claim_skips_staking() {
        let (mut token, accounts, mut ledger) = setup();
        let mut staking = fake(true);
        let mut events = Vec::new();
        {
            let mut ctx = Context::new(owner(), NOW, &mut token, &accounts, &mut events);
            ledger.set_stake_address(&mut ctx, &staking).unwrap();
            ledger.create_vest(&mut ctx, alice(), NOW + 10, NOW + 20, 0, 40).unwrap();
        }
        let mut ctx = Context::new(alice(), NOW + 5, &mut token, &accounts, &mut events);
        assert_eq!(
            ledger.claim_to_stake(&mut ctx, &mut staking, 0),
            Err(LockstepError::NothingToClaim)
        );
        assert!(staking.received.is_empty());
    }
}

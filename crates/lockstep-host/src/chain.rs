// crates/lockstep-host/src/chain.rs
//
// The transactional host.
//
// `Chain` owns everything a ledger operation can touch: the managed token,
// the native coin, foreign token ledgers, the contract registry and both
// engines. Every public operation goes through `transact`, which snapshots
// the whole state, runs the operation against a fresh `Context`, and puts
// the snapshot back if the operation fails. Events are buffered per
// operation and only published on commit, so a rejected operation leaves no
// trace at all. This is what makes `claim_to_stake` safe: the vesting side
// is rolled back when the staking side refuses.
//
// The snapshot is a full clone of the chain state, so each operation costs
// time proportional to every balance and position held. That is acceptable
// for a single-process simulator driving scenarios; a host with large state
// would journal writes instead of cloning.

use std::collections::BTreeMap;

use serde::Deserialize;

use lockstep_core::events::AssetKind;
use lockstep_core::{
    Address, Amount, Clock, Context, ContractRegistry, InMemoryToken, LedgerEvent, LockstepError,
    ManualClock, RecoverAsset, Timestamp, TokenLedger,
};
use lockstep_staking::{PoolParams, StakingLedger, StakingPosition};
use lockstep_vesting::VestingLedger;

use crate::config::{AssetSpec, ChainConfig};

/// Symbol of the native coin ledger.
const NATIVE_SYMBOL: &str = "NATIVE";

/// Selects one of the two engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Vesting,
    Staking,
}

/// The parts of the chain state an operation may touch besides the managed
/// token, which it reaches through its `Context`.
#[derive(Debug, Clone)]
pub struct Ledgers {
    pub vesting: VestingLedger,
    pub staking: StakingLedger,
    pub native: InMemoryToken,
    pub foreign: BTreeMap<Address, InMemoryToken>,
}

#[derive(Debug, Clone)]
struct ChainState {
    token: InMemoryToken,
    contracts: ContractRegistry,
    ledgers: Ledgers,
}

/// An in-memory chain hosting one vesting and one staking ledger.
pub struct Chain<C: Clock = ManualClock> {
    state: ChainState,
    clock: C,
    owner: Address,
    events: Vec<LedgerEvent>,
}

impl Chain<ManualClock> {
    /// Build a chain from `config` with a manual clock set to its start time.
    pub fn from_config(config: &ChainConfig) -> Result<Self, LockstepError> {
        Self::new(config, ManualClock::new(config.start_time))
    }

    /// Move chain time forward by `seconds`. Returns the new time.
    pub fn advance_time(&self, seconds: u64) -> Timestamp {
        let now = self.clock.advance(seconds);
        tracing::debug!(now, "Advanced chain time by {}s", seconds);
        now
    }

    /// Jump chain time to `now`.
    pub fn set_time(&self, now: Timestamp) {
        self.clock.set(now);
    }
}

impl<C: Clock> Chain<C> {
    /// Deploy both ledgers, register them as contracts and mint the genesis
    /// balances.
    pub fn new(config: &ChainConfig, clock: C) -> Result<Self, LockstepError> {
        let owner = config.owner_address();
        let vesting_address = config.vesting_address();
        let staking_address = config.staking_address();
        if vesting_address == staking_address {
            return Err(LockstepError::Config(
                "vesting and staking ledgers need distinct labels".to_string(),
            ));
        }

        let mut contracts = ContractRegistry::new();
        contracts.register(vesting_address);
        contracts.register(staking_address);

        let mut foreign = BTreeMap::new();
        for label in &config.foreign_tokens {
            let address = Address::from_label(label);
            contracts.register(address);
            foreign.insert(address, InMemoryToken::new(label));
        }

        let mut state = ChainState {
            token: InMemoryToken::new(&config.token_symbol),
            contracts,
            ledgers: Ledgers {
                vesting: VestingLedger::new(vesting_address, owner),
                staking: StakingLedger::new(staking_address, owner, vesting_address),
                native: InMemoryToken::new(NATIVE_SYMBOL),
                foreign,
            },
        };

        for balance in &config.balances {
            let account = Address::from_label(&balance.account);
            let ledger = state.token_ledger_mut(&balance.asset)?;
            if !ledger.mint(&account, balance.amount) {
                return Err(LockstepError::Config(format!(
                    "genesis balance for {} overflows the supply",
                    balance.account
                )));
            }
        }

        tracing::info!(
            owner = %owner.short(),
            vesting = %vesting_address.short(),
            staking = %staking_address.short(),
            accounts = config.balances.len(),
            "Chain created at {}",
            config.start_time
        );

        Ok(Self {
            state,
            clock,
            owner,
            events: Vec::new(),
        })
    }

    /// Run `op` as one all-or-nothing operation on behalf of `caller`.
    ///
    /// On `Err` every ledger is restored to its state before the call and
    /// the operation's events are dropped. The snapshot clones the whole
    /// state on every call, successful or not.
    pub fn transact<T>(
        &mut self,
        caller: Address,
        name: &'static str,
        op: impl FnOnce(&mut Ledgers, &mut Context<'_>) -> Result<T, LockstepError>,
    ) -> Result<T, LockstepError> {
        let now = self.clock.now();
        let snapshot = self.state.clone();
        let mut pending = Vec::new();

        let result = {
            let ChainState {
                token,
                contracts,
                ledgers,
            } = &mut self.state;
            let mut ctx = Context::new(caller, now, token, &*contracts, &mut pending);
            op(ledgers, &mut ctx)
        };

        match result {
            Ok(value) => {
                tracing::debug!(
                    op = name,
                    caller = %caller.short(),
                    events = pending.len(),
                    "Committed"
                );
                self.events.extend(pending);
                Ok(value)
            }
            Err(e) => {
                self.state = snapshot;
                tracing::warn!(op = name, caller = %caller.short(), "Rolled back: {}", e);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------
    // Token operations
    // -----------------------------------------------------------------

    /// Let `spender` pull up to `amount` of the caller's managed tokens.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LockstepError> {
        self.transact(caller, "approve", |_, ctx| {
            ctx.approve(&caller, &spender, amount)
        })
    }

    /// Move `amount` of `asset` from the caller to `to`.
    pub fn transfer_tokens(
        &mut self,
        caller: Address,
        to: Address,
        asset: &AssetSpec,
        amount: Amount,
    ) -> Result<(), LockstepError> {
        let ledger = self.state.token_ledger_mut(asset)?;
        if ledger.transfer(&caller, &to, amount) {
            Ok(())
        } else {
            Err(LockstepError::TokenTransfer(format!(
                "transfer of {} {} from {} to {} refused",
                amount,
                ledger.symbol(),
                caller.short(),
                to.short()
            )))
        }
    }

    // -----------------------------------------------------------------
    // Vesting ledger
    // -----------------------------------------------------------------

    pub fn create_vest(
        &mut self,
        caller: Address,
        account: Address,
        start_date: Timestamp,
        end_date: Timestamp,
        start_tokens: Amount,
        total_tokens: Amount,
    ) -> Result<(), LockstepError> {
        self.transact(caller, "create_vest", |l, ctx| {
            l.vesting
                .create_vest(ctx, account, start_date, end_date, start_tokens, total_tokens)
        })
    }

    pub fn mass_create_vest(
        &mut self,
        caller: Address,
        accounts: &[Address],
        start_dates: &[Timestamp],
        end_dates: &[Timestamp],
        start_tokens: &[Amount],
        total_tokens: &[Amount],
    ) -> Result<(), LockstepError> {
        self.transact(caller, "mass_create_vest", |l, ctx| {
            l.vesting.mass_create_vest(
                ctx,
                accounts,
                start_dates,
                end_dates,
                start_tokens,
                total_tokens,
            )
        })
    }

    /// Bind the vesting ledger to this chain's staking ledger.
    pub fn set_stake_address(&mut self, caller: Address) -> Result<(), LockstepError> {
        self.transact(caller, "set_stake_address", |l, ctx| {
            l.vesting.set_stake_address(ctx, &l.staking)
        })
    }

    pub fn claim(&mut self, caller: Address) -> Result<Amount, LockstepError> {
        self.transact(caller, "claim", |l, ctx| l.vesting.claim(ctx))
    }

    pub fn claim_for(
        &mut self,
        caller: Address,
        account: Address,
    ) -> Result<Amount, LockstepError> {
        self.transact(caller, "claim_for", |l, ctx| l.vesting.claim_for(ctx, account))
    }

    pub fn claim_one_for(
        &mut self,
        caller: Address,
        account: Address,
        index: usize,
    ) -> Result<Amount, LockstepError> {
        self.transact(caller, "claim_one_for", |l, ctx| {
            l.vesting.claim_one_for(ctx, account, index)
        })
    }

    /// The vesting ledger's `transfer` alias. Behaves as `claim`.
    pub fn vesting_transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Amount, LockstepError> {
        self.transact(caller, "transfer", |l, ctx| l.vesting.transfer(ctx, to, amount))
    }

    /// Stake the caller's unlocked vesting tokens into pool `pool_index`.
    pub fn claim_to_stake(
        &mut self,
        caller: Address,
        pool_index: usize,
    ) -> Result<Amount, LockstepError> {
        self.transact(caller, "claim_to_stake", |l, ctx| {
            l.vesting.claim_to_stake(ctx, &mut l.staking, pool_index)
        })
    }

    // -----------------------------------------------------------------
    // Staking ledger
    // -----------------------------------------------------------------

    pub fn add_stake_pool(
        &mut self,
        caller: Address,
        params: PoolParams,
    ) -> Result<usize, LockstepError> {
        self.transact(caller, "add_stake_pool", |l, ctx| {
            l.staking.add_stake_pool(ctx, params)
        })
    }

    pub fn deposit(
        &mut self,
        caller: Address,
        pool_id: usize,
        amount: Amount,
    ) -> Result<StakingPosition, LockstepError> {
        self.transact(caller, "deposit", |l, ctx| l.staking.deposit(ctx, pool_id, amount))
    }

    /// Withdraw every matured staking position of the caller.
    pub fn withdraw(&mut self, caller: Address) -> Result<Amount, LockstepError> {
        self.transact(caller, "withdraw", |l, ctx| l.staking.claim(ctx))
    }

    pub fn claim_stake(&mut self, caller: Address, index: usize) -> Result<Amount, LockstepError> {
        self.transact(caller, "claim_stake", |l, ctx| l.staking.claim_stake(ctx, index))
    }

    pub fn reclaim_rewards(&mut self, caller: Address) -> Result<Amount, LockstepError> {
        self.transact(caller, "reclaim_rewards", |l, ctx| l.staking.reclaim_rewards(ctx))
    }

    // -----------------------------------------------------------------
    // Owner operations on either ledger
    // -----------------------------------------------------------------

    /// Sweep unowed `asset` out of one of the ledgers to its owner.
    /// `amount == 0` sweeps everything available.
    pub fn recover(
        &mut self,
        caller: Address,
        ledger: LedgerKind,
        asset: AssetKind,
        amount: Amount,
    ) -> Result<Amount, LockstepError> {
        self.transact(caller, "recover", |l, ctx| {
            let Ledgers {
                vesting,
                staking,
                native,
                foreign,
            } = l;
            let target = recover_asset(native, foreign, asset)?;
            match ledger {
                LedgerKind::Vesting => vesting.recover(ctx, target, amount),
                LedgerKind::Staking => staking.recover(ctx, target, amount),
            }
        })
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        ledger: LedgerKind,
        new_owner: Address,
    ) -> Result<(), LockstepError> {
        self.transact(caller, "transfer_ownership", |l, ctx| match ledger {
            LedgerKind::Vesting => l.vesting.transfer_ownership(ctx, new_owner),
            LedgerKind::Staking => l.staking.transfer_ownership(ctx, new_owner),
        })
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Genesis owner of both ledgers.
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn vesting(&self) -> &VestingLedger {
        &self.state.ledgers.vesting
    }

    pub fn staking(&self) -> &StakingLedger {
        &self.state.ledgers.staking
    }

    /// Managed token balance of `account`.
    pub fn token_balance(&self, account: &Address) -> Amount {
        self.state.token.balance_of(account)
    }

    /// Balance of `account` in any of the chain's token ledgers.
    pub fn balance(&self, asset: &AssetSpec, account: &Address) -> Result<Amount, LockstepError> {
        let ledger: &InMemoryToken = match asset {
            AssetSpec::Managed => &self.state.token,
            AssetSpec::Native => &self.state.ledgers.native,
            AssetSpec::Foreign(label) => self
                .state
                .ledgers
                .foreign
                .get(&Address::from_label(label))
                .ok_or_else(|| unknown_token(label))?,
        };
        Ok(ledger.balance_of(account))
    }

    /// Managed token supply. Never changes after genesis.
    pub fn token_supply(&self) -> Amount {
        self.state.token.total_supply()
    }

    /// Events of every committed operation so far.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take the published events, leaving the buffer empty.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check both engines' bookkeeping and that each ledger's custody
    /// balance covers what it owes.
    pub fn check_invariants(&self) -> Result<(), LockstepError> {
        let vesting = &self.state.ledgers.vesting;
        let staking = &self.state.ledgers.staking;
        vesting.check_invariants()?;
        staking.check_invariants()?;

        let held = self.token_balance(&vesting.address());
        if held < vesting.vested() {
            return Err(LockstepError::InvariantViolated(format!(
                "vesting ledger holds {} but owes {}",
                held,
                vesting.vested()
            )));
        }

        let owed = staking
            .staked_and_rewards()
            .checked_add(staking.total_free_rewards())
            .ok_or(LockstepError::Overflow)?;
        let held = self.token_balance(&staking.address());
        if held < owed {
            return Err(LockstepError::InvariantViolated(format!(
                "staking ledger holds {} but owes {}",
                held, owed
            )));
        }
        Ok(())
    }
}

impl ChainState {
    fn token_ledger_mut(&mut self, asset: &AssetSpec) -> Result<&mut InMemoryToken, LockstepError> {
        match asset {
            AssetSpec::Managed => Ok(&mut self.token),
            AssetSpec::Native => Ok(&mut self.ledgers.native),
            AssetSpec::Foreign(label) => self
                .ledgers
                .foreign
                .get_mut(&Address::from_label(label))
                .ok_or_else(|| unknown_token(label)),
        }
    }
}

/// Resolve an asset kind into the ledger a recovery sweeps.
fn recover_asset<'a>(
    native: &'a mut InMemoryToken,
    foreign: &'a mut BTreeMap<Address, InMemoryToken>,
    kind: AssetKind,
) -> Result<RecoverAsset<'a>, LockstepError> {
    match kind {
        AssetKind::Managed => Ok(RecoverAsset::Managed),
        AssetKind::Native => Ok(RecoverAsset::Native(native)),
        AssetKind::Foreign(address) => {
            let ledger = foreign.get_mut(&address).ok_or_else(|| {
                LockstepError::InvalidArgument(format!("no token ledger at {}", address.short()))
            })?;
            Ok(RecoverAsset::Foreign { address, ledger })
        }
    }
}

fn unknown_token(label: &str) -> LockstepError {
    LockstepError::InvalidArgument(format!("no token ledger labelled '{}'", label))
}

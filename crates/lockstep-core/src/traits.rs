// crates/lockstep-core/src/traits.rs
//
// Capability traits consumed by the ledgers. The token, the clock, the
// owner gate and the code inspector are collaborators; the ledgers only
// ever see them through these interfaces.

use crate::context::Context;
use crate::error::LockstepError;
use crate::types::{Address, Amount, Timestamp};

/// Fungible token ledger holding balances and allowances.
///
/// Implemented by `InMemoryToken`. Every method reports failure through its
/// return value; the ledgers turn a `false` into a fatal rejection.
pub trait TokenLedger: Send + Sync {
    /// Move `amount` from `caller` to `to`.
    fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> bool;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool;

    /// Current balance of `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Set `spender`'s allowance over `owner`'s balance.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> bool;

    /// Ticker symbol, for log lines and events.
    fn symbol(&self) -> &str;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

/// Single-owner access gate.
pub trait AccessControl {
    /// Returns `true` if `caller` may run owner-only operations.
    fn is_owner(&self, caller: &Address) -> bool;
}

/// Answers whether an address carries code.
///
/// Vesting positions may only be granted to plain holders.
pub trait AccountInspector: Send + Sync {
    fn is_contract(&self, address: &Address) -> bool;
}

/// The staking side of the claim-to-stake bridge.
///
/// Implemented by the staking ledger; consumed by the vesting ledger, which
/// redirects a claim into a new staking position instead of paying it out.
pub trait StakeBridge {
    /// Address of the staking ledger (its token custody account).
    fn address(&self) -> Address;

    /// The vesting ledger this staking ledger accepts bridge calls from.
    fn vesting_address(&self) -> Address;

    /// Open a staking position for `account` funded by the caller.
    ///
    /// `ctx.caller` must be the registered vesting ledger. Returns `Ok(false)`
    /// when the deposit is refused, so the caller decides how to react.
    fn claim_to_stake(
        &mut self,
        ctx: &mut Context<'_>,
        account: &Address,
        pool_index: usize,
        amount: Amount,
    ) -> Result<bool, LockstepError>;
}

// crates/lockstep-core/src/context.rs
//
// Per-operation execution context.
//
// A `Context` is what a transaction sees of the outside world: who called,
// what time it is, the token ledger, the code inspector, and the event
// buffer. The host builds one per public operation and throws it away
// afterwards; nested calls between ledgers reborrow it with a new caller.

use crate::error::LockstepError;
use crate::events::LedgerEvent;
use crate::traits::{AccountInspector, TokenLedger};
use crate::types::{Address, Amount, Timestamp};

pub struct Context<'a> {
    /// The authenticated caller of the current operation.
    pub caller: Address,
    /// Time at which the operation executes. Constant for its whole duration.
    pub now: Timestamp,
    token: &'a mut dyn TokenLedger,
    accounts: &'a dyn AccountInspector,
    events: &'a mut Vec<LedgerEvent>,
}

impl<'a> Context<'a> {
    pub fn new(
        caller: Address,
        now: Timestamp,
        token: &'a mut dyn TokenLedger,
        accounts: &'a dyn AccountInspector,
        events: &'a mut Vec<LedgerEvent>,
    ) -> Self {
        Self {
            caller,
            now,
            token,
            accounts,
            events,
        }
    }

    /// Reborrow this context for a synchronous call made by `caller`.
    ///
    /// Time, token ledger and event buffer are shared with the outer call.
    pub fn nested(&mut self, caller: Address) -> Context<'_> {
        Context {
            caller,
            now: self.now,
            token: &mut *self.token,
            accounts: self.accounts,
            events: &mut *self.events,
        }
    }

    /// Returns `true` if `address` carries code.
    pub fn is_contract(&self, address: &Address) -> bool {
        self.accounts.is_contract(address)
    }

    /// Balance of `account` in the managed token.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    /// Pay `amount` out of `from`'s balance. A refusal is fatal.
    pub fn push_tokens(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LockstepError> {
        if self.token.transfer(from, to, amount) {
            Ok(())
        } else {
            Err(LockstepError::TokenTransfer(format!(
                "transfer of {} {} from {} to {} refused",
                amount,
                self.token.symbol(),
                from.short(),
                to.short()
            )))
        }
    }

    /// Pull `amount` from `from` into `to` using `spender`'s allowance.
    /// A refusal is fatal.
    pub fn pull_tokens(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LockstepError> {
        if self.token.transfer_from(spender, from, to, amount) {
            Ok(())
        } else {
            Err(LockstepError::TokenTransfer(format!(
                "pull of {} {} from {} by {} refused (balance or allowance too low)",
                amount,
                self.token.symbol(),
                from.short(),
                spender.short()
            )))
        }
    }

    /// Grant `spender` an allowance over `owner`'s balance.
    pub fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LockstepError> {
        if self.token.approve(owner, spender, amount) {
            Ok(())
        } else {
            Err(LockstepError::TokenTransfer(format!(
                "approval of {} for {} refused",
                spender.short(),
                owner.short()
            )))
        }
    }

    /// Record an event for the current operation.
    pub fn emit(&mut self, event: LedgerEvent) {
        tracing::info!(event = event.name(), "{:?}", event);
        self.events.push(event);
    }

    /// Events emitted so far in this operation.
    pub fn events(&self) -> &[LedgerEvent] {
        self.events
    }
}

// crates/lockstep-core/src/token.rs
//
// In-memory fungible token ledger.
//
// Tracks balances and allowances keyed by address. Used by the host as the
// managed token, the native coin, and any foreign token a ledger may end up
// holding. Refusals (insufficient balance or allowance) leave every balance
// untouched and report `false`, never panic.

use std::collections::BTreeMap;

use crate::traits::TokenLedger;
use crate::types::{Address, Amount};

/// Token ledger with ERC20-style balances and allowances.
#[derive(Debug, Clone)]
pub struct InMemoryToken {
    symbol: String,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl InMemoryToken {
    /// Create an empty ledger with the given ticker.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    /// Create new supply for `account`. Returns `false` on supply overflow.
    pub fn mint(&mut self, account: &Address, amount: Amount) -> bool {
        let Some(supply) = self.total_supply.checked_add(amount) else {
            return false;
        };
        let balance = self.balances.entry(*account).or_insert(0);
        // Cannot overflow: every balance is bounded by the total supply.
        *balance += amount;
        self.total_supply = supply;
        true
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Remaining allowance of `spender` over `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> bool {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return false;
        }
        if from == to || amount == 0 {
            return true;
        }
        self.balances.insert(*from, from_balance - amount);
        *self.balances.entry(*to).or_insert(0) += amount;
        true
    }
}

impl TokenLedger for InMemoryToken {
    fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> bool {
        if to.is_zero() {
            return false;
        }
        self.move_balance(caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool {
        if to.is_zero() {
            return false;
        }
        let allowance = self.allowance(from, spender);
        if allowance < amount || self.balance_of(from) < amount {
            return false;
        }
        // An unlimited allowance is never spent down.
        if allowance != Amount::MAX {
            self.allowances.insert((*from, *spender), allowance - amount);
        }
        self.move_balance(from, to, amount)
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> bool {
        if spender.is_zero() {
            return false;
        }
        self.allowances.insert((*owner, *spender), amount);
        true
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }
}

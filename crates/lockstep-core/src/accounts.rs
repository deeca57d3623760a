// crates/lockstep-core/src/accounts.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::traits::AccountInspector;
use crate::types::Address;

/// In-memory set of addresses known to carry code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractRegistry {
    contracts: BTreeSet<Address>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `address` as a contract.
    pub fn register(&mut self, address: Address) {
        self.contracts.insert(address);
    }
}

impl AccountInspector for ContractRegistry {
    fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains(address)
    }
}

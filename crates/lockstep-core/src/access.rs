// crates/lockstep-core/src/access.rs
//
// Single-owner access control.
//
// Each ledger carries its own `Ownable`. Owner-only operations call
// `require_owner` first and fail with `Unauthorized` for anyone else.

use serde::{Deserialize, Serialize};

use crate::error::LockstepError;
use crate::events::LedgerEvent;
use crate::traits::AccessControl;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    /// The current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fail unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Address) -> Result<(), LockstepError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(LockstepError::Unauthorized(format!(
                "caller {} is not the owner",
                caller.short()
            )))
        }
    }

    /// Hand ownership to `new_owner`.
    ///
    /// # Errors
    /// `Unauthorized` if `caller` is not the owner, `InvalidArgument` for the
    /// zero address.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<LedgerEvent, LockstepError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(LockstepError::InvalidArgument(
                "new owner is the zero address".to_string(),
            ));
        }
        let previous = self.owner;
        self.owner = new_owner;
        Ok(LedgerEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        })
    }
}

impl AccessControl for Ownable {
    fn is_owner(&self, caller: &Address) -> bool {
        self.owner == *caller
    }
}

// crates/lockstep-vesting/src/recovery.rs

use lockstep_core::recovery::sweep;
use lockstep_core::{Amount, Context, LockstepError, RecoverAsset};

use crate::ledger::VestingLedger;

impl VestingLedger {
    /// Sweep funds this ledger does not owe anyone to the owner.
    ///
    /// For the managed token, `vested` is held back first, so outstanding
    /// vesting obligations are never swept. `amount == 0` sweeps everything
    /// available.
    pub fn recover(
        &mut self,
        ctx: &mut Context<'_>,
        asset: RecoverAsset<'_>,
        amount: Amount,
    ) -> Result<Amount, LockstepError> {
        self.owner.require_owner(&ctx.caller)?;
        let owner = self.owner.owner();
        sweep(ctx, &self.address, &owner, asset, amount, self.vested)
    }
}

// crates/lockstep-core/src/recovery.rs
//
// Owner sweep of funds a ledger holds but does not owe anyone.
//
// Both ledgers share this logic; they differ only in how much of the
// managed token they have committed to outstanding positions. Committed
// funds are subtracted before anything is swept, so a recovery can never
// touch tokens that back a vesting or staking obligation.

use crate::context::Context;
use crate::error::LockstepError;
use crate::events::{AssetKind, LedgerEvent};
use crate::traits::TokenLedger;
use crate::types::{Address, Amount};

/// The asset a recovery targets.
pub enum RecoverAsset<'a> {
    /// The native coin ledger. No obligations are tracked in it.
    Native(&'a mut dyn TokenLedger),
    /// The managed token reached through the operation's context.
    Managed,
    /// Any other token ledger, identified by its address.
    Foreign {
        address: Address,
        ledger: &'a mut dyn TokenLedger,
    },
}

/// Sweep up to `amount` of `asset` from `holder` to `owner`.
///
/// An `amount` of zero means "everything available". For the managed token
/// `committed` is reserved first.
///
/// # Errors
/// `NothingToRecover` when nothing is available after the reservation,
/// `TokenTransfer` when the token ledger refuses the payout.
pub fn sweep(
    ctx: &mut Context<'_>,
    holder: &Address,
    owner: &Address,
    asset: RecoverAsset<'_>,
    amount: Amount,
    committed: Amount,
) -> Result<Amount, LockstepError> {
    let (kind, swept) = match asset {
        RecoverAsset::Native(ledger) => {
            let swept = sweep_free(ledger, holder, owner, amount)?;
            (AssetKind::Native, swept)
        }
        RecoverAsset::Foreign { address, ledger } => {
            let swept = sweep_free(ledger, holder, owner, amount)?;
            (AssetKind::Foreign(address), swept)
        }
        RecoverAsset::Managed => {
            let available = ctx.balance_of(holder).saturating_sub(committed);
            if available == 0 {
                return Err(LockstepError::NothingToRecover);
            }
            let swept = capped(amount, available);
            ctx.push_tokens(holder, owner, swept)?;
            (AssetKind::Managed, swept)
        }
    };

    tracing::info!(
        holder = %holder.short(),
        amount = swept,
        committed,
        "Recovered {:?}",
        kind
    );
    ctx.emit(LedgerEvent::Recovered {
        asset: kind,
        to: *owner,
        amount: swept,
    });
    Ok(swept)
}

fn sweep_free(
    ledger: &mut dyn TokenLedger,
    holder: &Address,
    owner: &Address,
    amount: Amount,
) -> Result<Amount, LockstepError> {
    let balance = ledger.balance_of(holder);
    if balance == 0 {
        return Err(LockstepError::NothingToRecover);
    }
    let swept = capped(amount, balance);
    if ledger.transfer(holder, owner, swept) {
        Ok(swept)
    } else {
        Err(LockstepError::TokenTransfer(format!(
            "recovery of {} {} refused",
            swept,
            ledger.symbol()
        )))
    }
}

fn capped(requested: Amount, available: Amount) -> Amount {
    if requested == 0 {
        available
    } else {
        requested.min(available)
    }
}

// crates/lockstep-vesting/src/lib.rs
//
// lockstep-vesting: time-gated linear release of locked token balances.
//
// An owner funds vesting positions for plain accounts. Each position
// unlocks a cliff amount at its start date and the remainder linearly up to
// its end date. Accounts claim what has unlocked, either to themselves or,
// through the staking bridge, straight into a staking pool.
//
// All amounts are in smallest token units (see `lockstep_core::UNIT`).

pub mod bridge;
pub mod curve;
pub mod ledger;
pub mod position;
pub mod recovery;

pub use curve::{claimable_amount, unlocked_amount, RELEASE_SCALE};
pub use ledger::VestingLedger;
pub use position::VestingPosition;

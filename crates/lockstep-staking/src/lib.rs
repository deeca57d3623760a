// crates/lockstep-staking/src/lib.rs
//
// lockstep-staking: fixed-term staking pools with pre-funded rewards.
//
// The owner opens pools with an entry window, a lock period, a reward rate
// in permill and a capacity, and funds the full reward for that capacity
// up front. Accounts deposit during the window, wait out the lock, and
// withdraw principal plus reward. Unfilled rewards of closed pools go back
// to the owner.

pub mod ledger;
pub mod pool;
pub mod position;

pub use ledger::{StakingLedger, MAX_STAKES_PER_ACCOUNT};
pub use pool::{pool_hash, reward_for, PoolHash, PoolParams, StakingPool, PERMILL_DENOMINATOR};
pub use position::StakingPosition;

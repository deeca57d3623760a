// crates/lockstep-core/src/lib.rs
//
// lockstep-core: Core types, capability traits, and in-memory collaborators
// shared by the Lockstep vesting and staking ledgers.
//
// This is the leaf crate that all other crates in the workspace depend on.
// The ledgers never talk to a token, a clock, or an owner directly; they go
// through the traits defined here, handed to them inside a `Context`.

pub mod access;
pub mod accounts;
pub mod clock;
pub mod context;
pub mod crypto;
pub mod error;
pub mod events;
pub mod recovery;
pub mod token;
pub mod traits;
pub mod types;
pub mod units;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use lockstep_core::Address;`

pub use access::Ownable;
pub use accounts::ContractRegistry;
pub use clock::{ManualClock, SystemClock};
pub use context::Context;
pub use error::LockstepError;
pub use events::LedgerEvent;
pub use recovery::RecoverAsset;
pub use token::InMemoryToken;
pub use traits::{AccessControl, AccountInspector, Clock, StakeBridge, TokenLedger};
pub use types::{Address, Amount, Timestamp};
pub use units::{Tokens, TOKEN_DECIMALS, UNIT};

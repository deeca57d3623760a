// crates/lockstep-host/src/lib.rs
//
// lockstep-host: an in-memory chain that owns the token ledgers, the clock,
// and both engines, and runs every public operation all-or-nothing.
//
// - `config`: genesis configuration loaded from TOML.
// - `chain`: the transactional host (`Chain`).
// - `scenario`: scripted sequences of operations for the CLI and tests.

pub mod chain;
pub mod config;
pub mod scenario;

pub use chain::{Chain, LedgerKind, Ledgers};
pub use config::{AssetSpec, ChainConfig, GenesisBalance};
pub use scenario::{Scenario, Step, StepOutcome};

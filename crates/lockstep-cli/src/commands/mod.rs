// crates/lockstep-cli/src/commands/mod.rs
//
// Command module declarations for the Lockstep CLI.

pub mod curve;
pub mod genesis;
pub mod run;

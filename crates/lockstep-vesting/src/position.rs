// crates/lockstep-vesting/src/position.rs

use serde::{Deserialize, Serialize};

use lockstep_core::{Amount, Timestamp};

/// A single vesting grant owned by one account.
///
/// Positions are never deleted. A fully claimed position stays in the list
/// with `claimed == total_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingPosition {
    /// Release starts strictly after this time.
    pub start_date: Timestamp,
    /// Everything is released strictly after this time.
    pub end_date: Timestamp,
    /// Cliff amount, unlocked as soon as the start date has passed.
    pub start_tokens: Amount,
    /// Amount unlocked by the end date. Always greater than `start_tokens`.
    pub total_tokens: Amount,
    /// Cumulative amount paid out. Only ever grows, never past `total_tokens`.
    pub claimed: Amount,
}

impl VestingPosition {
    pub fn new(
        start_date: Timestamp,
        end_date: Timestamp,
        start_tokens: Amount,
        total_tokens: Amount,
    ) -> Self {
        Self {
            start_date,
            end_date,
            start_tokens,
            total_tokens,
            claimed: 0,
        }
    }

    /// Tokens still held for this position (claimable or not yet unlocked).
    pub fn locked(&self) -> Amount {
        self.total_tokens.saturating_sub(self.claimed)
    }

    /// Returns `true` once everything has been paid out.
    pub fn is_exhausted(&self) -> bool {
        self.claimed >= self.total_tokens
    }
}

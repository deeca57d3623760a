use thiserror::Error;

/// Ledger-wide error types for Lockstep.
///
/// Every error is a rejection: the operation that produced it leaves no
/// state behind once the host rolls it back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockstepError {
    /// Caller is not the owner, or not the registered bridge.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed input: time ranges, amounts, addresses, pool parameters.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Parallel input arrays of different lengths.
    #[error("Length mismatch: all input arrays must have the same length")]
    LengthMismatch,

    /// Indexed access past the end of a list.
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The account holds no vesting or staking positions.
    #[error("No locks")]
    NoLocks,

    /// Nothing is currently claimable or withdrawable.
    #[error("Nothing to claim")]
    NothingToClaim,

    /// Nothing is recoverable once committed obligations are excluded.
    #[error("Nothing to recover")]
    NothingToRecover,

    /// The account already holds the maximum number of stakes.
    #[error("Too many stakes: at most {limit} open positions per account")]
    PositionLimit { limit: usize },

    /// A pool or per-account stake bound would be violated.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Deposit outside the pool's entry window.
    #[error("Pool is not accepting deposits at {now} (window {start}..{end})")]
    PoolClosed { now: u64, start: u64, end: u64 },

    /// The staking bridge can only be configured once.
    #[error("Stake address already set")]
    BridgeAlreadySet,

    /// The staking bridge has not been configured.
    #[error("Stake address not set")]
    BridgeNotSet,

    /// The token ledger rejected a transfer, pull, or approval.
    #[error("Token transfer failed: {0}")]
    TokenTransfer(String),

    /// The staking ledger refused a claim-to-stake deposit.
    #[error("Stake deposit refused: {0}")]
    StakeRefused(String),

    /// Checked arithmetic overflowed.
    #[error("Arithmetic overflow")]
    Overflow,

    /// A cached running total disagrees with its recomputed value.
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    /// Configuration could not be read or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LockstepError {
    fn from(e: serde_json::Error) -> Self {
        LockstepError::Serialization(e.to_string())
    }
}

// crates/lockstep-core/src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::hash_bytes;
use crate::error::LockstepError;

/// Token amount in the smallest unit of the managed token.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Seconds in one day, handy for schedules expressed in days.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// A 32-byte account address.
///
/// Addresses identify plain holders and contracts alike; whether an address
/// carries code is answered by an `AccountInspector`, not by the address.
/// Serializes as a `0x`-prefixed hex string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The null address. Never a valid beneficiary or owner.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Used by configuration files and tests so accounts can be named
    /// ("alice", "owner") instead of spelled out as 64 hex characters.
    pub fn from_label(label: &str) -> Self {
        Address(hash_bytes(label.as_bytes()))
    }

    /// Returns `true` for the null address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Short hex form (first four bytes), for log lines and tables.
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = LockstepError;

    /// Parse a `0x`-prefixed (or bare) 64-character hex string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| {
            LockstepError::InvalidArgument(format!(
                "address '{}' must be 32 bytes of hex: {}",
                s, e
            ))
        })?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// crates/lockstep-core/src/units.rs
//
// Token unit constants and a display/parse wrapper for amounts.
//
// The managed token has 18 decimals. All internal accounting uses the
// smallest unit (an `Amount`, u128) so there is never a floating-point
// value anywhere in the ledgers. `Tokens` only exists at the edges:
// config files, CLI output, and log lines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LockstepError;
use crate::types::Amount;

/// Number of decimals of the managed token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Smallest units in one whole token. 1 token = 10^18 units.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// An amount of the managed token.
///
/// Wraps an amount in smallest units. Displays as a decimal with trailing
/// zeros trimmed, and parses from the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tokens(pub Amount);

impl Tokens {
    /// Create an amount from whole tokens.
    pub fn whole(tokens: u64) -> Self {
        Self(tokens as Amount * UNIT)
    }

    /// Create an amount from smallest units.
    pub fn from_units(units: Amount) -> Self {
        Self(units)
    }

    /// The amount in smallest units.
    pub fn units(&self) -> Amount {
        self.0
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{}", whole, trimmed)
        }
    }
}

impl FromStr for Tokens {
    type Err = LockstepError;

    /// Parse a decimal token string such as `"2"`, `"1.5"` or `"0.000001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || LockstepError::InvalidArgument(format!("invalid token amount '{}'", s));

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if frac_str.len() > TOKEN_DECIMALS as usize {
            return Err(LockstepError::InvalidArgument(format!(
                "token amount '{}' has more than {} decimals",
                s, TOKEN_DECIMALS
            )));
        }
        if !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: Amount = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| invalid())?
        };
        let frac: Amount = if frac_str.is_empty() {
            0
        } else {
            let padded = format!("{:0<18}", frac_str);
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac))
            .map(Tokens)
            .ok_or(LockstepError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit() {
        assert_eq!(UNIT, 10u128.pow(TOKEN_DECIMALS));
    }

    #[test]
    fn test_display_whole() {
        assert_eq!(Tokens::whole(42).to_string(), "42");
        assert_eq!(Tokens::from_units(0).to_string(), "0");
    }

    #[test]
    fn test_display_fractional() {
        assert_eq!(Tokens::from_units(2 * UNIT + UNIT / 50).to_string(), "2.02");
        assert_eq!(Tokens::from_units(1).to_string(), "0.000000000000000001");
    }

    #[test]
    fn test_parse() {
        assert_eq!("1.5".parse::<Tokens>().unwrap(), Tokens::from_units(UNIT + UNIT / 2));
        assert_eq!("3".parse::<Tokens>().unwrap(), Tokens::whole(3));
        assert_eq!(".25".parse::<Tokens>().unwrap(), Tokens::from_units(UNIT / 4));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Tokens>().is_err());
        assert!("1.2.3".parse::<Tokens>().is_err());
        assert!("-1".parse::<Tokens>().is_err());
        assert!("0.0000000000000000001".parse::<Tokens>().is_err());
    }
}

// crates/lockstep-host/src/config.rs
//
// Genesis configuration for a Lockstep chain.
// Loaded from a TOML file or populated with sensible defaults.

use std::fs;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use lockstep_core::{Address, Amount, LockstepError, Timestamp, Tokens};

/// Genesis configuration for a chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Symbol of the managed token.
    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,

    /// Label of the account that owns both ledgers.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Label of the vesting ledger's custody address.
    #[serde(default = "default_vesting_label")]
    pub vesting_label: String,

    /// Label of the staking ledger's custody address.
    #[serde(default = "default_staking_label")]
    pub staking_label: String,

    /// Chain time at genesis, in seconds since the Unix epoch.
    #[serde(default = "default_start_time")]
    pub start_time: Timestamp,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Labels of extra token ledgers deployed at genesis. Each lives at
    /// `Address::from_label(label)` and uses the label as its symbol.
    #[serde(default)]
    pub foreign_tokens: Vec<String>,

    /// Balances minted at genesis.
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
}

/// Which token ledger a balance or a recovery refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSpec {
    /// The chain's native coin.
    Native,
    /// The managed token both ledgers keep their books in.
    #[default]
    Managed,
    /// A foreign token ledger, by label.
    Foreign(String),
}

/// One genesis mint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisBalance {
    /// Label of the receiving account.
    pub account: String,
    /// Decimal token amount, e.g. "1000" or "2.5".
    #[serde(deserialize_with = "token_amount")]
    pub amount: Amount,
    #[serde(default)]
    pub asset: AssetSpec,
}

fn default_token_symbol() -> String {
    "LOCK".to_string()
}

fn default_owner() -> String {
    "owner".to_string()
}

fn default_vesting_label() -> String {
    "vesting".to_string()
}

fn default_staking_label() -> String {
    "staking".to_string()
}

fn default_start_time() -> Timestamp {
    1_700_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            token_symbol: default_token_symbol(),
            owner: default_owner(),
            vesting_label: default_vesting_label(),
            staking_label: default_staking_label(),
            start_time: default_start_time(),
            log_level: default_log_level(),
            foreign_tokens: Vec::new(),
            balances: Vec::new(),
        }
    }
}

impl ChainConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, LockstepError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LockstepError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, LockstepError> {
        toml::from_str(contents).map_err(|e| LockstepError::Config(e.to_string()))
    }

    pub fn owner_address(&self) -> Address {
        Address::from_label(&self.owner)
    }

    pub fn vesting_address(&self) -> Address {
        Address::from_label(&self.vesting_label)
    }

    pub fn staking_address(&self) -> Address {
        Address::from_label(&self.staking_label)
    }
}

/// Deserialize a decimal token string ("2.02") into smallest units.
pub(crate) fn token_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    Tokens::from_str(&text)
        .map(|t| t.units())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::UNIT;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();
        assert_eq!(config.token_symbol, "LOCK");
        assert_eq!(config.start_time, 1_700_000_000);
        assert_eq!(config.owner_address(), Address::from_label("owner"));
        assert!(config.balances.is_empty());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = ChainConfig::parse(
            r#"
            token_symbol = "VEST"
            foreign_tokens = ["usdc"]

            [[balances]]
            account = "owner"
            amount = "1000"

            [[balances]]
            account = "alice"
            amount = "2.5"
            asset = "native"

            [[balances]]
            account = "vesting"
            amount = "3"
            asset = { foreign = "usdc" }
            "#,
        )
        .unwrap();

        assert_eq!(config.token_symbol, "VEST");
        assert_eq!(config.vesting_label, "vesting");
        assert_eq!(config.balances.len(), 3);
        assert_eq!(config.balances[0].amount, 1_000 * UNIT);
        assert_eq!(config.balances[0].asset, AssetSpec::Managed);
        assert_eq!(config.balances[1].amount, 5 * UNIT / 2);
        assert_eq!(config.balances[1].asset, AssetSpec::Native);
        assert_eq!(
            config.balances[2].asset,
            AssetSpec::Foreign("usdc".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_amount() {
        let result = ChainConfig::parse(
            r#"
            [[balances]]
            account = "owner"
            amount = "1.2.3"
            "#,
        );
        assert!(matches!(result, Err(LockstepError::Config(_))));
    }
}

//! Common types used across Volx
//!
//! Scale constants live here so that every crate agrees on the fixed-point
//! units used by the ledger.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unix timestamp in whole seconds
pub type Timestamp = u64;

/// Base unit of cumulative funding-fee-per-unit values and collateral ratios
pub const PRECISION_DECIMALS: u128 = 10_000_000_000;

/// Denominator of deposit/withdraw/open/close/premium fee percentages
pub const MAX_FEE_PERCENTAGE: u128 = 10_000;

/// Number of seconds in one funding period
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Highest leverage tier; liquidation tables are sized by it
pub const MAX_LEVERAGE: u8 = 8;

/// Identity of a caller or position owner
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Create an account identity, rejecting blank names
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_account("account name must not be empty"));
        }
        Ok(Self(name))
    }

    /// Get the account name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Account {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_rejects_blank() {
        assert!(Account::new("").is_err());
        assert!(Account::new("   ").is_err());
        assert_eq!(Account::new("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_account_ordering_is_lexicographic() {
        let a: Account = "alice".parse().unwrap();
        let b: Account = "bob".parse().unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "alice");
    }
}

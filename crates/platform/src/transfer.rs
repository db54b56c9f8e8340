//! Collateral token transfers
//!
//! The platform moves collateral through [`CollateralTransfer`] exactly once
//! per operation, after every check has passed and before any ledger is
//! updated.

use std::collections::HashMap;
use std::sync::Arc;

use common::Account;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance for {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: Account,
        needed: u128,
        available: u128,
    },

    #[error("Balance overflow for {0}")]
    Overflow(Account),
}

/// Fungible collateral balances
pub trait CollateralTransfer: Send + Sync {
    fn transfer(&self, from: &Account, to: &Account, amount: u128) -> Result<(), TransferError>;

    fn balance_of(&self, account: &Account) -> u128;
}

/// In-process balance table; clones share balances
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollateralLedger {
    balances: Arc<RwLock<HashMap<Account, u128>>>,
}

impl InMemoryCollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air
    pub fn mint(&self, account: &Account, amount: u128) -> Result<(), TransferError> {
        let mut balances = self.balances.write();
        let balance = balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.clone()))?;
        debug!(account = %account, amount, "Collateral minted");
        Ok(())
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.read().values().sum()
    }
}

impl CollateralTransfer for InMemoryCollateralLedger {
    fn transfer(&self, from: &Account, to: &Account, amount: u128) -> Result<(), TransferError> {
        if amount == 0 || from == to {
            return Ok(());
        }

        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                needed: amount,
                available,
            });
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        balances.insert(from.clone(), available - amount);
        balances.insert(to.clone(), credited);
        debug!(from = %from, to = %to, amount, "Collateral transferred");
        Ok(())
    }

    fn balance_of(&self, account: &Account) -> u128 {
        self.balances.read().get(account).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn account(name: &str) -> Account {
        Account::new(name).unwrap()
    }

    #[test]
    fn test_transfer_moves_balance() {
        let ledger = InMemoryCollateralLedger::new();
        ledger.mint(&account("alice"), 100).unwrap();
        ledger.transfer(&account("alice"), &account("pool"), 40).unwrap();

        assert_eq!(ledger.balance_of(&account("alice")), 60);
        assert_eq!(ledger.balance_of(&account("pool")), 40);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn test_insufficient_balance_leaves_ledger_unchanged() {
        let ledger = InMemoryCollateralLedger::new();
        ledger.mint(&account("alice"), 10).unwrap();

        assert_matches!(
            ledger.transfer(&account("alice"), &account("bob"), 11),
            Err(TransferError::InsufficientBalance { needed: 11, available: 10, .. })
        );
        assert_eq!(ledger.balance_of(&account("alice")), 10);
        assert_eq!(ledger.balance_of(&account("bob")), 0);
    }

    #[test]
    fn test_clones_share_balances() {
        let ledger = InMemoryCollateralLedger::new();
        let other = ledger.clone();
        ledger.mint(&account("alice"), 5).unwrap();
        assert_eq!(other.balance_of(&account("alice")), 5);
    }
}

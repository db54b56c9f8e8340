//! Leveraged positions
//!
//! A position is identified by its owner. Units are leverage-adjusted
//! exposure, priced as `units * index / max_index`. A position with zero
//! units is removed from the book, never stored.

use std::collections::BTreeMap;

use common::{mul_div, Account, Timestamp, PRECISION_DECIMALS};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub position_units: u128,
    pub leverage: u8,
    pub open_index_value: u64,
    /// Funding-fee baseline and close-fee decay start; reset on merge
    pub creation_timestamp: Timestamp,
    pub original_creation_timestamp: Timestamp,
}

/// Settled view of a position at the current index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBalance {
    /// Absolute value of `gross - funding_fees - margin_debt`
    pub balance: u128,
    pub is_positive: bool,
    pub position_units: u128,
    pub leverage: u8,
    pub funding_fees: u128,
    pub margin_debt: u128,
}

impl Position {
    /// Funding fees accrued since the position's creation snapshot
    pub fn funding_fees(&self, latest_cumulative: u128, creation_cumulative: u128) -> Result<u128> {
        let per_unit = latest_cumulative.saturating_sub(creation_cumulative);
        Ok(mul_div(self.position_units, per_unit, PRECISION_DECIMALS)?)
    }

    /// Collateral the pool fronted at open: `units * open_index * (L - 1) / max_index / L`
    pub fn margin_debt(&self, max_index: u64) -> Result<u128> {
        if max_index == 0 || self.leverage == 0 {
            return Err(PlatformError::DivisionByZero);
        }
        let numerator = self
            .position_units
            .checked_mul(u128::from(self.open_index_value))
            .and_then(|v| v.checked_mul(u128::from(self.leverage - 1)))
            .ok_or(PlatformError::MathOverflow)?;
        Ok(numerator / u128::from(max_index) / u128::from(self.leverage))
    }

    pub fn balance(
        &self,
        index: u64,
        max_index: u64,
        latest_cumulative: u128,
        creation_cumulative: u128,
    ) -> Result<PositionBalance> {
        let gross = mul_div(self.position_units, u128::from(index), u128::from(max_index))?;
        let funding_fees = self.funding_fees(latest_cumulative, creation_cumulative)?;
        let margin_debt = self.margin_debt(max_index)?;

        let owed = funding_fees
            .checked_add(margin_debt)
            .ok_or(PlatformError::MathOverflow)?;
        let (balance, is_positive) = if gross >= owed {
            (gross - owed, true)
        } else {
            (owed - gross, false)
        };

        Ok(PositionBalance {
            balance,
            is_positive,
            position_units: self.position_units,
            leverage: self.leverage,
            funding_fees,
            margin_debt,
        })
    }
}

/// Positions keyed by owner, iterated in account order
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: BTreeMap<Account, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &Account) -> Option<&Position> {
        self.positions.get(account)
    }

    /// Insert or replace; zero-unit positions are removed instead
    pub fn upsert(&mut self, account: Account, position: Position) {
        if position.position_units == 0 {
            self.positions.remove(&account);
        } else {
            self.positions.insert(account, position);
        }
    }

    pub fn remove(&mut self, account: &Account) -> Option<Position> {
        self.positions.remove(account)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Account, &Position)> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn total_units(&self) -> u128 {
        self.positions.values().map(|p| p.position_units).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: u128 = PRECISION_DECIMALS;

    fn position(units: u128, leverage: u8, open_index: u64) -> Position {
        Position {
            position_units: units,
            leverage,
            open_index_value: open_index,
            creation_timestamp: 100,
            original_creation_timestamp: 100,
        }
    }

    #[test]
    fn test_unleveraged_balance_tracks_index() {
        let pos = position(4_000_000, 1, 5_000);

        let at_open = pos.balance(5_000, 20_000, P, P).unwrap();
        assert_eq!(at_open.balance, 1_000_000);
        assert!(at_open.is_positive);
        assert_eq!(at_open.margin_debt, 0);

        let doubled = pos.balance(10_000, 20_000, P, P).unwrap();
        assert_eq!(doubled.balance, 2_000_000);
    }

    #[test]
    fn test_funding_fees_reduce_balance() {
        let pos = position(4_000_000, 1, 5_000);
        let balance = pos.balance(5_000, 20_000, P + 250_000_000, P).unwrap();

        assert_eq!(balance.funding_fees, 100_000);
        assert_eq!(balance.balance, 900_000);
    }

    #[test]
    fn test_leveraged_margin_debt_and_negative_balance() {
        // 2x: 1_000_000 own collateral, 1_000_000 fronted by the pool
        let pos = position(8_000_000, 2, 5_000);
        assert_eq!(pos.margin_debt(20_000).unwrap(), 1_000_000);

        let halved = pos.balance(2_500, 20_000, P, P).unwrap();
        assert_eq!(halved.balance, 0);
        assert!(halved.is_positive);

        let crashed = pos.balance(2_000, 20_000, P, P).unwrap();
        assert_eq!(crashed.balance, 200_000);
        assert!(!crashed.is_positive);
    }

    #[test]
    fn test_book_removes_zero_unit_positions() {
        let mut book = PositionBook::new();
        let alice = Account::new("alice").unwrap();

        book.upsert(alice.clone(), position(10, 1, 5_000));
        assert_eq!(book.len(), 1);
        assert_eq!(book.total_units(), 10);

        book.upsert(alice.clone(), position(0, 1, 5_000));
        assert!(book.get(&alice).is_none());
        assert!(book.is_empty());
    }
}

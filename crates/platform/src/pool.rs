//! Pool aggregates and liquidity-provider shares
//!
//! [`PoolState`] holds the five aggregates every operation must keep
//! consistent. Operations mutate a copy through its transition methods and
//! hand the result to [`PoolLedger::commit`] only after every check passed.

use std::collections::{BTreeMap, HashMap};

use common::{mul_div, Account, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub lp_supply: u128,
    /// Deposits, position collateral and fronted margin
    pub pooled_collateral: u128,
    pub total_position_units: u128,
    /// Funding fees owed by open positions, not yet realized
    pub total_funding_fees: u128,
    pub total_margin_debt: u128,
}

fn add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(PlatformError::MathOverflow)
}

fn sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(PlatformError::MathOverflow)
}

impl PoolState {
    /// `pooled - units * index / max_index + funding_fees`, floored at zero
    pub fn pool_balance(&self, index: u64, max_index: u64) -> Result<u128> {
        let exposure = mul_div(self.total_position_units, u128::from(index), u128::from(max_index))?;
        Ok(add(self.pooled_collateral, self.total_funding_fees)?.saturating_sub(exposure))
    }

    /// Cash the pool account should hold
    pub fn cash(&self) -> u128 {
        self.pooled_collateral.saturating_sub(self.total_margin_debt)
    }

    pub fn accrue_funding(&mut self, amount: u128) -> Result<()> {
        self.total_funding_fees = add(self.total_funding_fees, amount)?;
        self.normalize();
        Ok(())
    }

    pub fn deposit(&mut self, amount: u128, lp_minted: u128) -> Result<()> {
        self.pooled_collateral = add(self.pooled_collateral, amount)?;
        self.lp_supply = add(self.lp_supply, lp_minted)?;
        Ok(())
    }

    pub fn withdraw(&mut self, tokens_out: u128, lp_burned: u128) -> Result<()> {
        self.pooled_collateral = self
            .pooled_collateral
            .checked_sub(tokens_out)
            .ok_or(PlatformError::InsufficientLiquidity)?;
        self.lp_supply = sub(self.lp_supply, lp_burned)?;
        Ok(())
    }

    /// Add a position worth `leveraged` of which `margin_debt` is fronted by
    /// the pool; `fees` stay in the pool
    pub fn open_position(&mut self, units: u128, leveraged: u128, margin_debt: u128, fees: u128) -> Result<()> {
        self.total_position_units = add(self.total_position_units, units)?;
        self.pooled_collateral = add(add(self.pooled_collateral, leveraged)?, fees)?;
        self.total_margin_debt = add(self.total_margin_debt, margin_debt)?;
        Ok(())
    }

    /// Take a settled share of a position out of the aggregates
    ///
    /// `released` leaves the pool on top of the margin debt: the owner's
    /// payout on close, the residual equity on merge, zero on liquidation.
    pub fn settle_position(
        &mut self,
        units: u128,
        funding_fees: u128,
        margin_debt: u128,
        released: u128,
    ) -> Result<()> {
        self.total_position_units = sub(self.total_position_units, units)?;
        self.total_funding_fees = self.total_funding_fees.saturating_sub(funding_fees);
        self.total_margin_debt = self.total_margin_debt.saturating_sub(margin_debt);
        self.pooled_collateral = self
            .pooled_collateral
            .checked_sub(add(margin_debt, released)?)
            .ok_or(PlatformError::InsufficientLiquidity)?;
        self.normalize();
        Ok(())
    }

    pub fn pay_reward(&mut self, amount: u128) -> Result<()> {
        self.pooled_collateral = self
            .pooled_collateral
            .checked_sub(amount)
            .ok_or(PlatformError::InsufficientLiquidity)?;
        Ok(())
    }

    /// With no open positions nothing is owed or fronted
    ///
    /// Settling recomputes margin debt from floored units, so a few units of
    /// debt can outlive the last position. They were never cash, so they
    /// leave `pooled_collateral` together with the debt.
    fn normalize(&mut self) {
        if self.total_position_units == 0 {
            self.total_funding_fees = 0;
            self.pooled_collateral = self.pooled_collateral.saturating_sub(self.total_margin_debt);
            self.total_margin_debt = 0;
        }
    }
}

/// Pool aggregates plus per-account LP balances and deposit times
#[derive(Debug, Default)]
pub struct PoolLedger {
    state: PoolState,
    lp_balances: BTreeMap<Account, u128>,
    last_deposit: HashMap<Account, Timestamp>,
}

impl PoolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn lp_balance_of(&self, account: &Account) -> u128 {
        self.lp_balances.get(account).copied().unwrap_or(0)
    }

    pub fn last_deposit(&self, account: &Account) -> Option<Timestamp> {
        self.last_deposit.get(account).copied()
    }

    /// Replace the aggregates with a state computed from them
    pub fn commit(&mut self, state: PoolState) {
        self.state = state;
    }

    /// Commit a deposit; `lp_minted` must already be included in `state`
    pub fn commit_deposit(&mut self, state: PoolState, account: &Account, lp_minted: u128, now: Timestamp) {
        self.state = state;
        *self.lp_balances.entry(account.clone()).or_insert(0) += lp_minted;
        self.last_deposit.insert(account.clone(), now);
    }

    /// Commit a withdrawal; the caller checked `lp_burned` against the balance
    pub fn commit_withdraw(&mut self, state: PoolState, account: &Account, lp_burned: u128) {
        self.state = state;
        let remaining = self.lp_balance_of(account).saturating_sub(lp_burned);
        if remaining == 0 {
            self.lp_balances.remove(account);
        } else {
            self.lp_balances.insert(account.clone(), remaining);
        }
    }

    pub fn lp_holders(&self) -> impl Iterator<Item = (&Account, &u128)> {
        self.lp_balances.iter()
    }

    /// LP supply equals the sum of balances
    #[cfg(debug_assertions)]
    pub fn debug_check_invariants(&self) {
        let held: u128 = self.lp_balances.values().sum();
        assert_eq!(held, self.state.lp_supply, "LP supply out of sync with balances");
        if self.state.total_position_units == 0 {
            assert_eq!(self.state.total_funding_fees, 0);
            assert_eq!(self.state.total_margin_debt, 0);
        }
    }
}

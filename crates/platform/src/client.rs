//! Shareable async handle to a [`Platform`]
//!
//! The platform is a single-writer state machine. The handle serializes
//! writers behind a `tokio::sync::RwLock` while views share the read lock.

use std::sync::Arc;

use common::Account;
use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::{CloseResult, LiquidationOutcome, OpenResult, Platform, WithdrawResult};
use crate::error::Result;
use crate::event::PlatformEvent;
use crate::pool::PoolState;
use crate::position::PositionBalance;
use crate::snapshot::Snapshot;

#[derive(Clone)]
pub struct PlatformHandle {
    inner: Arc<RwLock<Platform>>,
}

impl PlatformHandle {
    pub fn new(platform: Platform) -> Self {
        debug!(platform = platform.name(), "Platform handle created");
        Self {
            inner: Arc::new(RwLock::new(platform)),
        }
    }

    pub async fn deposit(&self, caller: &Account, amount: u128) -> Result<u128> {
        self.inner.write().await.deposit(caller, amount)
    }

    pub async fn withdraw(&self, caller: &Account, token_amount: u128, max_lp_burn: u128) -> Result<WithdrawResult> {
        self.inner.write().await.withdraw(caller, token_amount, max_lp_burn)
    }

    pub async fn withdraw_lp_tokens(&self, caller: &Account, lp_amount: u128) -> Result<WithdrawResult> {
        self.inner.write().await.withdraw_lp_tokens(caller, lp_amount)
    }

    pub async fn open_position(
        &self,
        caller: &Account,
        collateral_in: u128,
        max_index_value: u64,
        leverage: u8,
    ) -> Result<OpenResult> {
        self.inner
            .write()
            .await
            .open_position(caller, collateral_in, max_index_value, leverage)
    }

    pub async fn close_position(&self, caller: &Account, units: u128, min_index_value: u64) -> Result<CloseResult> {
        self.inner.write().await.close_position(caller, units, min_index_value)
    }

    pub async fn liquidate_positions(&self, caller: &Account, accounts: &[Account]) -> Result<LiquidationOutcome> {
        self.inner.write().await.liquidate_positions(caller, accounts)
    }

    pub async fn refresh(&self) -> Result<Snapshot> {
        self.inner.write().await.refresh()
    }

    pub async fn calculate_balance(&self, account: &Account) -> Result<PositionBalance> {
        self.inner.read().await.calculate_balance(account)
    }

    pub async fn get_liquidable_addresses(&self) -> Result<Vec<Account>> {
        self.inner.read().await.get_liquidable_addresses()
    }

    pub async fn pool_balance(&self) -> Result<u128> {
        self.inner.read().await.pool_balance()
    }

    pub async fn pool_state(&self) -> PoolState {
        self.inner.read().await.pool_state()
    }

    pub async fn lp_balance_of(&self, account: &Account) -> u128 {
        self.inner.read().await.lp_balance_of(account)
    }

    /// Events with a sequence number of at least `from_sequence`
    pub async fn events_from(&self, from_sequence: u64) -> Vec<PlatformEvent> {
        self.inner.read().await.events().get_from(from_sequence)
    }

    /// Run `f` against a write-locked platform
    pub async fn write<T>(&self, f: impl FnOnce(&mut Platform) -> T) -> T {
        f(&mut *self.inner.write().await)
    }

    /// Run `f` against a read-locked platform
    pub async fn read<T>(&self, f: impl FnOnce(&Platform) -> T) -> T {
        f(&*self.inner.read().await)
    }
}

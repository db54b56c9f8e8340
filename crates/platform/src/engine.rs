//! Platform orchestration
//!
//! Every state-changing operation follows the same shape:
//! 1. validate inputs
//! 2. prepare a snapshot refresh at the current timestamp
//! 3. compute the new pool state on a copy and check it
//! 4. move collateral once
//! 5. commit snapshot, pool, positions and events
//!
//! A failure before step 5 leaves the platform untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{mul_div, mul_div_ceil, Account, Clock, Timestamp, MAX_LEVERAGE};
use config::MasterConfig;
use fee_model::{collateral_ratio, percent_of, FeeModel, FeeParameters};
use index_oracle::IndexOracle;
use liquidation::{LiquidationCalculator, LiquidationParameters};
use observability::PlatformMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PlatformError, Result};
use crate::event::PlatformEvent;
use crate::log::EventLog;
use crate::pool::{PoolLedger, PoolState};
use crate::position::{Position, PositionBalance, PositionBook};
use crate::snapshot::{Snapshot, SnapshotLedger, SnapshotUpdate};
use crate::transfer::CollateralTransfer;

/// External services the platform depends on
#[derive(Clone)]
pub struct Collaborators {
    /// Source of index rounds
    pub oracle: Arc<dyn IndexOracle>,
    /// Moves collateral between accounts
    pub transfer: Arc<dyn CollateralTransfer>,
    pub clock: Arc<dyn Clock>,
    /// Account holding the pool's collateral
    pub pool_account: Account,
}

/// Owner-managed runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// LP tokens minted per collateral unit into an empty pool
    pub initial_lp_rate: u128,
    /// Highest leverage an open may request
    pub max_leverage: u8,
    /// Seconds after a deposit before the depositor may withdraw
    pub lp_lockup_seconds: u64,
    /// Skip the post-withdraw liquidity check
    pub emergency_withdraw_allowed: bool,
    /// Accounts that always pay the base close fee
    pub lock_exempt: BTreeSet<Account>,
}

/// Outcome of a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawResult {
    pub lp_burned: u128,
    /// Withdraw fee kept by the pool
    pub fee: u128,
    /// Collateral paid to the caller
    pub tokens_out: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResult {
    /// Units of the position after the open (merged positions included)
    pub position_units: u128,
    pub open_fee: u128,
    pub premium_fee: u128,
    /// Premium plus turbulence, over `MAX_FEE_PERCENTAGE`
    pub premium_percent: u32,
    /// Whether an existing position was folded into this one
    pub merged: bool,
}

/// Outcome of a full or partial close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResult {
    /// Collateral paid to the owner after the close fee
    pub tokens_out: u128,
    pub close_fee: u128,
    /// Decayed close fee percent applied
    pub close_fee_percent: u32,
    /// Units still held; zero once the position is gone
    pub remaining_units: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Accounts whose positions were removed, in request order
    pub liquidated: Vec<Account>,
    /// Total reward paid to the caller
    pub reward: u128,
}

/// Leveraged volatility-index pool
pub struct Platform {
    /// Display name, also the metrics label
    name: String,
    /// Only account allowed to change parameters
    owner: Account,
    /// Holds pooled collateral; also the turbulence updater
    pool_account: Account,
    oracle: Arc<dyn IndexOracle>,
    transfer: Arc<dyn CollateralTransfer>,
    clock: Arc<dyn Clock>,
    /// Owner-managed settings
    settings: PlatformSettings,
    /// Fee schedule and turbulence indicator
    fee_model: FeeModel,
    /// Liquidation thresholds and rewards
    liquidation: LiquidationCalculator,
    /// Cumulative funding fee per unit over time
    snapshots: SnapshotLedger,
    /// Open positions by account
    positions: PositionBook,
    /// Aggregates and LP balances
    pool: PoolLedger,
    /// Sequenced record of committed changes
    events: EventLog,
    metrics: PlatformMetrics,
}

#[cfg(test)]
impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn config_error(err: impl std::fmt::Display) -> PlatformError {
    PlatformError::Config(err.to_string())
}

fn add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(PlatformError::MathOverflow)
}

impl Platform {
    pub fn from_config(config: &MasterConfig, collaborators: Collaborators) -> Result<Self> {
        let owner = Account::new(config.platform.owner.clone()).map_err(config_error)?;

        let max_index_value = collaborators.oracle.max_index_value();
        if max_index_value == 0 {
            return Err(config_error("max_index_value must be positive"));
        }
        if !(1..=MAX_LEVERAGE).contains(&config.platform.max_leverage) {
            return Err(PlatformError::InvalidLeverage {
                leverage: config.platform.max_leverage,
                max: MAX_LEVERAGE,
            });
        }
        if config.platform.initial_lp_rate == 0 {
            return Err(config_error("initial_lp_rate must be positive"));
        }

        let fee_params = FeeParameters::from(&config.fees);
        fee_params.validate()?;
        let liquidation_params = LiquidationParameters::from(&config.liquidation);
        liquidation_params.validate()?;

        let lock_exempt = config
            .platform
            .lock_exempt_accounts
            .iter()
            .map(|name| Account::new(name.clone()))
            .collect::<common::Result<BTreeSet<_>>>()
            .map_err(config_error)?;

        let settings = PlatformSettings {
            initial_lp_rate: config.platform.initial_lp_rate,
            max_leverage: config.platform.max_leverage,
            lp_lockup_seconds: config.platform.lp_lockup_seconds,
            emergency_withdraw_allowed: config.platform.emergency_withdraw_allowed,
            lock_exempt,
        };

        info!(
            platform = %config.platform.name,
            owner = %owner,
            pool_account = %collaborators.pool_account,
            max_index_value,
            max_leverage = settings.max_leverage,
            "Platform initialized"
        );

        Ok(Self {
            name: config.platform.name.clone(),
            fee_model: FeeModel::new(fee_params, max_index_value, collaborators.pool_account.clone()),
            liquidation: LiquidationCalculator::new(liquidation_params, max_index_value),
            metrics: PlatformMetrics::new(&config.platform.name),
            owner,
            pool_account: collaborators.pool_account,
            oracle: collaborators.oracle,
            transfer: collaborators.transfer,
            clock: collaborators.clock,
            settings,
            snapshots: SnapshotLedger::new(),
            positions: PositionBook::new(),
            pool: PoolLedger::new(),
            events: EventLog::new(),
        })
    }

    // ==============================================================================
    // LIQUIDITY
    // ==============================================================================

    /// Deposit collateral and mint LP tokens, rounding the mint down
    pub fn deposit(&mut self, caller: &Account, amount: u128) -> Result<u128> {
        let _timer = self.metrics.start_timer("deposit");
        let result = self.try_deposit(caller, amount);
        self.observe("deposit", &result);
        result
    }

    /// Withdraw `token_amount` of collateral, burning at most `max_lp_burn`
    /// LP tokens; the burn rounds up
    pub fn withdraw(&mut self, caller: &Account, token_amount: u128, max_lp_burn: u128) -> Result<WithdrawResult> {
        let _timer = self.metrics.start_timer("withdraw");
        let result = self.try_withdraw(caller, token_amount, max_lp_burn);
        self.observe("withdraw", &result);
        result
    }

    /// Burn exactly `lp_amount` LP tokens for their share of the pool
    pub fn withdraw_lp_tokens(&mut self, caller: &Account, lp_amount: u128) -> Result<WithdrawResult> {
        let _timer = self.metrics.start_timer("withdraw_lp_tokens");
        let result = self.try_withdraw_lp_tokens(caller, lp_amount);
        self.observe("withdraw_lp_tokens", &result);
        result
    }

    fn try_deposit(&mut self, caller: &Account, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(PlatformError::InvalidAmount);
        }

        let now = self.clock.now();
        let update = self.prepare_refresh(now)?;
        let mut state = self.accrued_state(&update)?;

        let balance = state.pool_balance(update.index_value, self.max_index_value())?;
        let fee = self.fee_model.deposit_fee(amount)?;
        let net = amount.checked_sub(fee).ok_or(PlatformError::MathOverflow)?;

        let lp_minted = if balance == 0 || state.lp_supply == 0 {
            net.checked_mul(self.settings.initial_lp_rate)
                .ok_or(PlatformError::MathOverflow)?
        } else {
            mul_div(net, state.lp_supply, balance)?
        };
        if lp_minted == 0 {
            return Err(PlatformError::TooFewLpTokens);
        }

        state.deposit(amount, lp_minted)?;
        self.transfer.transfer(caller, &self.pool_account, amount)?;

        self.commit_refresh(&update);
        self.pool.commit_deposit(state, caller, lp_minted, now);
        self.emit(|sequence| PlatformEvent::Deposit {
            sequence,
            account: caller.clone(),
            token_amount: amount,
            lp_minted,
            fee,
        });
        self.after_commit(&update);

        info!(account = %caller, amount, lp_minted, fee, "Deposit");
        Ok(lp_minted)
    }

    fn try_withdraw(&mut self, caller: &Account, token_amount: u128, max_lp_burn: u128) -> Result<WithdrawResult> {
        if token_amount == 0 || max_lp_burn == 0 {
            return Err(PlatformError::InvalidAmount);
        }

        let now = self.clock.now();
        self.ensure_unlocked(caller, now)?;
        let update = self.prepare_refresh(now)?;
        let state = self.accrued_state(&update)?;

        let balance = state.pool_balance(update.index_value, self.max_index_value())?;
        if balance == 0 {
            return Err(PlatformError::InsufficientLiquidity);
        }

        let lp_burned = mul_div_ceil(token_amount, state.lp_supply, balance)?;
        if lp_burned > max_lp_burn {
            return Err(PlatformError::LpBurnExceedsLimit {
                required: lp_burned,
                max: max_lp_burn,
            });
        }

        self.finish_withdraw(caller, &update, state, lp_burned, token_amount)
    }

    fn try_withdraw_lp_tokens(&mut self, caller: &Account, lp_amount: u128) -> Result<WithdrawResult> {
        if lp_amount == 0 {
            return Err(PlatformError::InvalidAmount);
        }

        let now = self.clock.now();
        self.ensure_unlocked(caller, now)?;
        let update = self.prepare_refresh(now)?;
        let state = self.accrued_state(&update)?;

        if state.lp_supply == 0 {
            return Err(PlatformError::InsufficientLpTokens {
                requested: lp_amount,
                available: 0,
            });
        }
        let balance = state.pool_balance(update.index_value, self.max_index_value())?;
        let token_amount = mul_div(lp_amount, balance, state.lp_supply)?;
        if token_amount == 0 {
            return Err(PlatformError::InvalidAmount);
        }

        self.finish_withdraw(caller, &update, state, lp_amount, token_amount)
    }

    fn finish_withdraw(
        &mut self,
        caller: &Account,
        update: &SnapshotUpdate,
        mut state: PoolState,
        lp_burned: u128,
        token_amount: u128,
    ) -> Result<WithdrawResult> {
        let available = self.pool.lp_balance_of(caller);
        if lp_burned > available {
            return Err(PlatformError::InsufficientLpTokens {
                requested: lp_burned,
                available,
            });
        }

        let fee = self.fee_model.withdraw_fee(token_amount)?;
        let tokens_out = token_amount.checked_sub(fee).ok_or(PlatformError::MathOverflow)?;

        state.withdraw(tokens_out, lp_burned)?;
        if state.pooled_collateral < state.total_margin_debt {
            return Err(PlatformError::InsufficientLiquidity);
        }
        if !self.settings.emergency_withdraw_allowed && state.total_position_units > state.pooled_collateral {
            return Err(PlatformError::InsufficientLiquidity);
        }

        self.transfer.transfer(&self.pool_account, caller, tokens_out)?;

        self.commit_refresh(update);
        self.pool.commit_withdraw(state, caller, lp_burned);
        self.emit(|sequence| PlatformEvent::Withdraw {
            sequence,
            account: caller.clone(),
            token_amount,
            lp_burned,
            fee,
            tokens_out,
        });
        self.after_commit(update);

        info!(account = %caller, token_amount, lp_burned, fee, tokens_out, "Withdraw");
        Ok(WithdrawResult {
            lp_burned,
            fee,
            tokens_out,
        })
    }

    fn ensure_unlocked(&self, caller: &Account, now: Timestamp) -> Result<()> {
        if let Some(last_deposit) = self.pool.last_deposit(caller) {
            let unlock_at = last_deposit.saturating_add(self.settings.lp_lockup_seconds);
            if now < unlock_at {
                return Err(PlatformError::LockupNotExpired { unlock_at });
            }
        }
        Ok(())
    }

    // ==============================================================================
    // POSITIONS
    // ==============================================================================

    /// Open a position, or merge into the caller's existing one
    ///
    /// Fails with `PriceTooHigh` when the index is above `max_index_value`.
    pub fn open_position(
        &mut self,
        caller: &Account,
        collateral_in: u128,
        max_index_value: u64,
        leverage: u8,
    ) -> Result<OpenResult> {
        let _timer = self.metrics.start_timer("open_position");
        let result = self.try_open_position(caller, collateral_in, max_index_value, leverage);
        self.observe("open_position", &result);
        result
    }

    /// Close `units` of the caller's position
    ///
    /// Fails with `PriceTooLow` when the index is below `min_index_value`.
    pub fn close_position(&mut self, caller: &Account, units: u128, min_index_value: u64) -> Result<CloseResult> {
        let _timer = self.metrics.start_timer("close_position");
        let result = self.try_close_position(caller, units, min_index_value);
        self.observe("close_position", &result);
        result
    }

    fn try_open_position(
        &mut self,
        caller: &Account,
        collateral_in: u128,
        max_index_bound: u64,
        leverage: u8,
    ) -> Result<OpenResult> {
        if collateral_in == 0 {
            return Err(PlatformError::InvalidAmount);
        }
        if leverage == 0 || leverage > self.settings.max_leverage {
            return Err(PlatformError::InvalidLeverage {
                leverage,
                max: self.settings.max_leverage,
            });
        }
        let max_index = self.max_index_value();
        if max_index_bound == 0 || max_index_bound > max_index {
            return Err(PlatformError::InvalidIndexBound(max_index_bound));
        }

        let now = self.clock.now();
        let update = self.prepare_refresh(now)?;
        let index = update.index_value;
        if index > max_index_bound {
            return Err(PlatformError::PriceTooHigh {
                index,
                max_acceptable: max_index_bound,
            });
        }

        let mut state = self.accrued_state(&update)?;

        let existing = self.positions.get(caller).copied();
        let residual = match &existing {
            Some(position) => {
                let settled = self.settle(position, &update)?;
                if !settled.is_positive {
                    return Err(PlatformError::NegativeBalance(caller.clone()));
                }
                state.settle_position(
                    position.position_units,
                    settled.funding_fees,
                    settled.margin_debt,
                    settled.balance,
                )?;
                settled.balance
            }
            None => 0,
        };

        let leverage_factor = u128::from(leverage);
        let leveraged_in = collateral_in
            .checked_mul(leverage_factor)
            .ok_or(PlatformError::MathOverflow)?;
        let open_fee = self.fee_model.open_fee(leveraged_in)?;

        let max_units = mul_div(leveraged_in, u128::from(max_index), u128::from(index))?;
        let ratio_before = collateral_ratio(state.total_position_units, state.pooled_collateral)?;
        let ratio_after = collateral_ratio(
            add(state.total_position_units, max_units)?,
            add(state.pooled_collateral, leveraged_in)?,
        )?;
        let turbulence = update
            .turbulence
            .map_or(self.fee_model.turbulence_indicator(), |pending| pending.value());
        let premium = self
            .fee_model
            .premium_fee(leveraged_in, ratio_before, ratio_after, turbulence)?;

        let fees = add(open_fee, premium.fee)?;
        let net = match collateral_in.checked_sub(fees) {
            Some(net) if net > 0 => net,
            _ => {
                return Err(PlatformError::FeesExceedCollateral {
                    collateral: collateral_in,
                    fees,
                })
            }
        };

        let equity = add(residual, net)?;
        let leveraged = equity
            .checked_mul(leverage_factor)
            .ok_or(PlatformError::MathOverflow)?;
        let position_units = mul_div(leveraged, u128::from(max_index), u128::from(index))?;
        if position_units == 0 {
            return Err(PlatformError::InvalidAmount);
        }

        state.open_position(position_units, leveraged, leveraged - equity, fees)?;
        if state.total_position_units > state.pooled_collateral {
            return Err(PlatformError::InsufficientLiquidity);
        }

        let position = Position {
            position_units,
            leverage,
            open_index_value: index,
            creation_timestamp: now,
            original_creation_timestamp: existing.map_or(now, |p| p.original_creation_timestamp),
        };

        self.transfer.transfer(caller, &self.pool_account, collateral_in)?;

        self.commit_refresh(&update);
        self.pool.commit(state);
        self.positions.upsert(caller.clone(), position);
        let merged = existing.is_some();
        self.emit(|sequence| PlatformEvent::OpenPosition {
            sequence,
            account: caller.clone(),
            collateral_in,
            leverage,
            index_value: index,
            open_fee,
            premium_fee: premium.fee,
            premium_percent: premium.percent,
            position_units,
            merged,
        });
        self.after_commit(&update);

        info!(
            account = %caller,
            collateral_in,
            leverage,
            index,
            position_units,
            open_fee,
            premium_fee = premium.fee,
            merged,
            "Position opened"
        );

        Ok(OpenResult {
            position_units,
            open_fee,
            premium_fee: premium.fee,
            premium_percent: premium.percent,
            merged,
        })
    }

    fn try_close_position(&mut self, caller: &Account, units: u128, min_index_bound: u64) -> Result<CloseResult> {
        let position = self
            .positions
            .get(caller)
            .copied()
            .ok_or_else(|| PlatformError::NoPosition(caller.clone()))?;
        let held = position.position_units;
        if units == 0 || units > held {
            return Err(PlatformError::InvalidUnits {
                requested: units,
                held,
            });
        }
        let max_index = self.max_index_value();
        if min_index_bound == 0 || min_index_bound > max_index {
            return Err(PlatformError::InvalidIndexBound(min_index_bound));
        }

        let now = self.clock.now();
        let update = self.prepare_refresh(now)?;
        let index = update.index_value;
        if index < min_index_bound {
            return Err(PlatformError::PriceTooLow {
                index,
                min_acceptable: min_index_bound,
            });
        }

        let mut state = self.accrued_state(&update)?;
        let settled = self.settle(&position, &update)?;
        if !settled.is_positive {
            return Err(PlatformError::NegativeBalance(caller.clone()));
        }

        let gross = mul_div(units, u128::from(index), u128::from(max_index))?;
        let funding_fees = mul_div(settled.funding_fees, units, held)?;
        let margin_debt = mul_div(settled.margin_debt, units, held)?;
        let balance = gross
            .checked_sub(add(funding_fees, margin_debt)?)
            .ok_or_else(|| PlatformError::NegativeBalance(caller.clone()))?;

        let lock_exempt = self.settings.lock_exempt.contains(caller);
        let close_fee_percent = self
            .fee_model
            .close_fee_percent(now, position.creation_timestamp, lock_exempt);
        let close_fee = percent_of(balance, close_fee_percent)?;
        let tokens_out = balance - close_fee;

        state.settle_position(units, funding_fees, margin_debt, tokens_out)?;
        let remaining_units = held - units;

        self.transfer.transfer(&self.pool_account, caller, tokens_out)?;

        self.commit_refresh(&update);
        self.pool.commit(state);
        self.positions.upsert(
            caller.clone(),
            Position {
                position_units: remaining_units,
                ..position
            },
        );
        self.emit(|sequence| PlatformEvent::ClosePosition {
            sequence,
            account: caller.clone(),
            units_closed: units,
            index_value: index,
            close_fee,
            close_fee_percent,
            tokens_out,
            remaining_units,
        });
        self.after_commit(&update);

        info!(
            account = %caller,
            units,
            index,
            tokens_out,
            close_fee,
            close_fee_percent,
            remaining_units,
            "Position closed"
        );

        Ok(CloseResult {
            tokens_out,
            close_fee,
            close_fee_percent,
            remaining_units,
        })
    }

    // ==============================================================================
    // LIQUIDATION
    // ==============================================================================

    /// Liquidate every candidate among `accounts` and pay the caller
    ///
    /// Non-candidates are skipped; the call fails only when none qualify.
    pub fn liquidate_positions(&mut self, caller: &Account, accounts: &[Account]) -> Result<LiquidationOutcome> {
        let _timer = self.metrics.start_timer("liquidate_positions");
        let result = self.try_liquidate_positions(caller, accounts);
        self.observe("liquidate_positions", &result);
        result
    }

    fn try_liquidate_positions(&mut self, caller: &Account, accounts: &[Account]) -> Result<LiquidationOutcome> {
        let now = self.clock.now();
        let update = self.prepare_refresh(now)?;
        let mut state = self.accrued_state(&update)?;

        let mut liquidated: Vec<(Account, PositionBalance)> = Vec::new();
        let mut reward: u128 = 0;

        for account in accounts {
            if liquidated.iter().any(|(done, _)| done == account) {
                continue;
            }
            let Some(position) = self.positions.get(account).copied() else {
                continue;
            };

            let settled = self.settle(&position, &update)?;
            if !self.liquidation.is_liquidation_candidate(
                settled.balance,
                settled.is_positive,
                position.position_units,
                position.leverage,
            )? {
                continue;
            }

            let position_reward = self.liquidation.liquidation_reward(
                settled.balance,
                settled.is_positive,
                position.position_units,
                position.leverage,
                position.open_index_value,
            )?;
            state.settle_position(position.position_units, settled.funding_fees, settled.margin_debt, 0)?;
            reward = add(reward, position_reward)?;
            liquidated.push((account.clone(), settled));
        }

        if liquidated.is_empty() {
            return Err(PlatformError::NoLiquidablePosition);
        }

        state.pay_reward(reward)?;
        if state.pooled_collateral < state.total_margin_debt {
            return Err(PlatformError::InsufficientLiquidity);
        }

        self.transfer.transfer(&self.pool_account, caller, reward)?;

        self.commit_refresh(&update);
        self.pool.commit(state);
        for (account, settled) in &liquidated {
            self.positions.remove(account);
            self.emit(|sequence| PlatformEvent::LiquidatePosition {
                sequence,
                account: account.clone(),
                balance: settled.balance,
                is_positive: settled.is_positive,
                position_units: settled.position_units,
                leverage: settled.leverage,
            });
            warn!(
                account = %account,
                balance = settled.balance,
                is_positive = settled.is_positive,
                position_units = settled.position_units,
                "Position liquidated"
            );
        }
        let count = liquidated.len();
        self.emit(|sequence| PlatformEvent::LiquidationReward {
            sequence,
            caller: caller.clone(),
            amount: reward,
            positions: count,
        });
        self.metrics.record_liquidations(count);
        self.after_commit(&update);

        info!(caller = %caller, positions = count, reward, "Liquidation reward paid");
        Ok(LiquidationOutcome {
            liquidated: liquidated.into_iter().map(|(account, _)| account).collect(),
            reward,
        })
    }

    /// Accounts whose positions can currently be liquidated
    pub fn get_liquidable_addresses(&self) -> Result<Vec<Account>> {
        let update = self.prepare_refresh(self.clock.now())?;
        let mut candidates = Vec::new();

        for (account, position) in self.positions.iter() {
            let settled = self.settle(position, &update)?;
            if self.liquidation.is_liquidation_candidate(
                settled.balance,
                settled.is_positive,
                position.position_units,
                position.leverage,
            )? {
                candidates.push(account.clone());
            }
        }

        Ok(candidates)
    }

    /// Reward a liquidator would receive for `account` right now
    pub fn liquidation_reward_preview(&self, account: &Account) -> Result<u128> {
        let position = self
            .positions
            .get(account)
            .ok_or_else(|| PlatformError::NoPosition(account.clone()))?;
        let update = self.prepare_refresh(self.clock.now())?;
        let settled = self.settle(position, &update)?;

        Ok(self.liquidation.liquidation_reward(
            settled.balance,
            settled.is_positive,
            position.position_units,
            position.leverage,
            position.open_index_value,
        )?)
    }

    // ==============================================================================
    // VIEWS
    // ==============================================================================

    /// Balance of `account`'s position at the current index, including
    /// funding fees accrued up to now
    pub fn calculate_balance(&self, account: &Account) -> Result<PositionBalance> {
        let position = self
            .positions
            .get(account)
            .ok_or_else(|| PlatformError::NoPosition(account.clone()))?;
        let update = self.prepare_refresh(self.clock.now())?;
        self.settle(position, &update)
    }

    /// Pool value owned by LPs at the current index
    pub fn pool_balance(&self) -> Result<u128> {
        let update = self.prepare_refresh(self.clock.now())?;
        self.accrued_state(&update)?
            .pool_balance(update.index_value, self.max_index_value())
    }

    pub fn collateral_ratio(&self) -> Result<u128> {
        let state = self.pool.state();
        Ok(collateral_ratio(state.total_position_units, state.pooled_collateral)?)
    }

    /// Record a snapshot at the current timestamp
    pub fn refresh(&mut self) -> Result<Snapshot> {
        let update = self.prepare_refresh(self.clock.now())?;
        let state = self.accrued_state(&update)?;
        self.commit_refresh(&update);
        self.pool.commit(state);
        self.after_commit(&update);
        Ok(Snapshot {
            timestamp: update.timestamp,
            cumulative_fee_per_unit: update.cumulative_fee_per_unit,
        })
    }

    pub fn total_position_units_amount(&self) -> u128 {
        self.pool.state().total_position_units
    }

    pub fn total_funding_fees_amount(&self) -> u128 {
        self.pool.state().total_funding_fees
    }

    pub fn total_leveraged_tokens_amount(&self) -> u128 {
        self.pool.state().pooled_collateral
    }

    pub fn total_margin_debt(&self) -> u128 {
        self.pool.state().total_margin_debt
    }

    pub fn lp_supply(&self) -> u128 {
        self.pool.state().lp_supply
    }

    pub fn pool_state(&self) -> PoolState {
        self.pool.state()
    }

    pub fn lp_balance_of(&self, account: &Account) -> u128 {
        self.pool.lp_balance_of(account)
    }

    pub fn lp_holders(&self) -> impl Iterator<Item = (&Account, &u128)> {
        self.pool.lp_holders()
    }

    pub fn position(&self, account: &Account) -> Option<Position> {
        self.positions.get(account).copied()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Account, &Position)> {
        self.positions.iter()
    }

    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.snapshots.latest()
    }

    pub fn turbulence_indicator(&self) -> u32 {
        self.fee_model.turbulence_indicator()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Account {
        &self.owner
    }

    pub fn pool_account(&self) -> &Account {
        &self.pool_account
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn fee_parameters(&self) -> &FeeParameters {
        self.fee_model.params()
    }

    pub fn liquidation_parameters(&self) -> &LiquidationParameters {
        self.liquidation.params()
    }

    pub fn max_index_value(&self) -> u64 {
        self.fee_model.max_index_value()
    }

    // ==============================================================================
    // OWNER SETTERS
    // ==============================================================================

    pub fn set_fee_parameters(&mut self, caller: &Account, params: FeeParameters) -> Result<()> {
        self.ensure_owner(caller)?;
        let value = serde_json::to_string(&params).unwrap_or_default();
        self.fee_model.set_parameters(params)?;
        self.record_parameter("fee_parameters", value);
        Ok(())
    }

    pub fn set_liquidation_parameters(&mut self, caller: &Account, params: LiquidationParameters) -> Result<()> {
        self.ensure_owner(caller)?;
        let value = serde_json::to_string(&params).unwrap_or_default();
        self.liquidation.set_parameters(params)?;
        self.record_parameter("liquidation_parameters", value);
        Ok(())
    }

    pub fn set_max_leverage(&mut self, caller: &Account, max_leverage: u8) -> Result<()> {
        self.ensure_owner(caller)?;
        if max_leverage == 0 || max_leverage > MAX_LEVERAGE {
            return Err(PlatformError::InvalidLeverage {
                leverage: max_leverage,
                max: MAX_LEVERAGE,
            });
        }
        self.settings.max_leverage = max_leverage;
        self.record_parameter("max_leverage", max_leverage.to_string());
        Ok(())
    }

    pub fn set_lp_lockup(&mut self, caller: &Account, seconds: u64) -> Result<()> {
        self.ensure_owner(caller)?;
        self.settings.lp_lockup_seconds = seconds;
        self.record_parameter("lp_lockup_seconds", seconds.to_string());
        Ok(())
    }

    pub fn set_emergency_withdraw_allowed(&mut self, caller: &Account, allowed: bool) -> Result<()> {
        self.ensure_owner(caller)?;
        self.settings.emergency_withdraw_allowed = allowed;
        self.record_parameter("emergency_withdraw_allowed", allowed.to_string());
        Ok(())
    }

    pub fn set_lock_exempt(&mut self, caller: &Account, account: &Account, exempt: bool) -> Result<()> {
        self.ensure_owner(caller)?;
        if exempt {
            self.settings.lock_exempt.insert(account.clone());
        } else {
            self.settings.lock_exempt.remove(account);
        }
        self.record_parameter("lock_exempt", format!("{}={}", account, exempt));
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Account, new_owner: Account) -> Result<()> {
        self.ensure_owner(caller)?;
        self.record_parameter("owner", new_owner.to_string());
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: &Account) -> Result<()> {
        if caller != &self.owner {
            warn!(caller = %caller, "Rejected owner-only call");
            return Err(PlatformError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    fn record_parameter(&mut self, name: &str, value: String) {
        info!(parameter = name, value = %value, "Parameter updated");
        self.emit(|sequence| PlatformEvent::ParameterUpdated {
            sequence,
            name: name.to_string(),
            value,
        });
    }

    // ==============================================================================
    // INTERNALS
    // ==============================================================================

    fn prepare_refresh(&self, now: Timestamp) -> Result<SnapshotUpdate> {
        self.snapshots.prepare(
            now,
            self.oracle.as_ref(),
            &self.fee_model,
            &self.pool_account,
            self.pool.state().total_position_units,
        )
    }

    fn accrued_state(&self, update: &SnapshotUpdate) -> Result<PoolState> {
        let mut state = self.pool.state();
        state.accrue_funding(update.funding_fees_added)?;
        Ok(state)
    }

    fn commit_refresh(&mut self, update: &SnapshotUpdate) {
        self.snapshots.commit(update);
        if let Some(pending) = update.turbulence {
            self.fee_model.apply_turbulence(pending);
        }
        if update.is_new {
            let turbulence = self.fee_model.turbulence_indicator();
            self.emit(|sequence| PlatformEvent::SnapshotRecorded {
                sequence,
                timestamp: update.timestamp,
                cumulative_fee_per_unit: update.cumulative_fee_per_unit,
                round_id: update.round_id,
                index_value: update.index_value,
                turbulence,
            });
        }
    }

    fn settle(&self, position: &Position, update: &SnapshotUpdate) -> Result<PositionBalance> {
        let creation_cumulative = self
            .snapshots
            .cumulative_at(position.creation_timestamp)
            .ok_or(PlatformError::MissingSnapshot(position.creation_timestamp))?;
        position.balance(
            update.index_value,
            self.max_index_value(),
            update.cumulative_fee_per_unit,
            creation_cumulative,
        )
    }

    fn emit(&mut self, build: impl FnOnce(u64) -> PlatformEvent) {
        let event = build(self.events.next_sequence());
        self.events.append(event);
    }

    fn after_commit(&self, update: &SnapshotUpdate) {
        #[cfg(debug_assertions)]
        self.debug_check_invariants();

        let state = self.pool.state();
        let balance = state
            .pool_balance(update.index_value, self.max_index_value())
            .unwrap_or_default();
        self.metrics
            .set_pool_state(balance, state.total_position_units, self.fee_model.turbulence_indicator());
    }

    fn observe<T>(&self, operation: &'static str, result: &Result<T>) {
        match result {
            Ok(_) => self.metrics.record_success(operation),
            Err(err) => {
                let kind = err.kind().as_str();
                warn!(operation, kind, error = %err, "Operation rejected");
                self.metrics.record_failure(operation, kind);
            }
        }
    }

    /// Cross-ledger consistency checks run after every commit
    #[cfg(debug_assertions)]
    pub fn debug_check_invariants(&self) {
        self.snapshots.debug_check_invariants();
        self.pool.debug_check_invariants();
        assert_eq!(
            self.positions.total_units(),
            self.pool.state().total_position_units,
            "position units out of sync with pool aggregate"
        );
        assert!(self.positions.iter().all(|(_, p)| p.position_units > 0));
    }
}

use common::{mul_div, Account, Timestamp, MAX_FEE_PERCENTAGE};
use tracing::{debug, info};

use crate::error::{FeeError, Result};
use crate::funding;
use crate::params::FeeParameters;
use crate::premium::{self, PremiumFee};
use crate::turbulence::{turbulence_after, InterRoundPeriods, TurbulenceLimits};

/// Turbulence value computed by [`FeeModel::preview_inter_round_periods`]
///
/// Only the fee model can create one, so holding it proves the update was
/// authorized. Apply it with [`FeeModel::apply_turbulence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTurbulence {
    value: u32,
}

impl PendingTurbulence {
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Fee calculator owned by the platform
///
/// Stateless apart from the turbulence indicator, which only the configured
/// updater may move.
#[derive(Debug, Clone)]
pub struct FeeModel {
    params: FeeParameters,
    max_index_value: u64,
    turbulence: u32,
    turbulence_updater: Account,
}

impl FeeModel {
    pub fn new(params: FeeParameters, max_index_value: u64, turbulence_updater: Account) -> Self {
        Self {
            params,
            max_index_value,
            turbulence: 0,
            turbulence_updater,
        }
    }

    pub fn params(&self) -> &FeeParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: FeeParameters) -> Result<()> {
        params.validate()?;
        info!(?params, "Fee parameters updated");
        self.params = params;
        Ok(())
    }

    pub fn max_index_value(&self) -> u64 {
        self.max_index_value
    }

    pub fn turbulence_indicator(&self) -> u32 {
        self.turbulence
    }

    pub fn turbulence_updater(&self) -> &Account {
        &self.turbulence_updater
    }

    fn limits(&self) -> TurbulenceLimits {
        TurbulenceLimits {
            step: self.params.turbulence_step_percent,
            max: self.params.turbulence_max_percent,
            noise_floor: self.params.turbulence_noise_floor_percent,
            heartbeat: self.params.turbulence_heartbeat,
        }
    }

    /// Compute the indicator after `periods` without changing it
    pub fn preview_inter_round_periods(&self, caller: &Account, periods: InterRoundPeriods) -> Result<PendingTurbulence> {
        if caller != &self.turbulence_updater {
            return Err(FeeError::UnauthorizedUpdater(caller.clone()));
        }
        Ok(PendingTurbulence {
            value: turbulence_after(self.turbulence, periods, self.limits()),
        })
    }

    pub fn apply_turbulence(&mut self, pending: PendingTurbulence) {
        if pending.value != self.turbulence {
            debug!(from = self.turbulence, to = pending.value, "Turbulence indicator updated");
        }
        self.turbulence = pending.value;
    }

    /// Feed inter-round periods into the turbulence indicator
    pub fn record_inter_round_periods(&mut self, caller: &Account, periods: InterRoundPeriods) -> Result<u32> {
        let pending = self.preview_inter_round_periods(caller, periods)?;
        self.apply_turbulence(pending);
        Ok(self.turbulence)
    }

    pub fn funding_rate(&self, index: u64) -> u64 {
        funding::funding_rate(index, self.params.funding_min_rate, self.params.funding_max_rate)
    }

    pub fn single_unit_funding_fee(&self, index: u64, period: u64) -> Result<u128> {
        Ok(funding::single_unit_funding_fee(
            index,
            period,
            self.max_index_value,
            self.params.funding_min_rate,
            self.params.funding_max_rate,
        )?)
    }

    /// Premium on `amount` (collateral times leverage) for a ratio move
    pub fn premium_fee(&self, amount: u128, ratio_before: u128, ratio_after: u128, turbulence: u32) -> Result<PremiumFee> {
        Ok(premium::premium_fee(
            amount,
            ratio_before,
            ratio_after,
            turbulence,
            self.params.premium_min_collateral_ratio,
            self.params.premium_coefficient,
            self.params.premium_max_percent,
        )?)
    }

    /// Close fee percent, decaying linearly from the early-close maximum
    pub fn close_fee_percent(&self, now: Timestamp, creation: Timestamp, lock_exempt: bool) -> u32 {
        let base = self.params.close_fee_percent;
        let max = self.params.close_max_fee_percent.max(base);
        let period = self.params.close_decay_period;
        let elapsed = now.saturating_sub(creation);

        if lock_exempt || elapsed >= period {
            return base;
        }

        // elapsed < period, so the decay never exceeds max - base
        let decay = u64::from(max - base) * elapsed / period;
        max - decay as u32
    }

    pub fn open_fee(&self, amount: u128) -> Result<u128> {
        percent_of(amount, self.params.open_fee_percent)
    }

    pub fn deposit_fee(&self, amount: u128) -> Result<u128> {
        percent_of(amount, self.params.deposit_fee_percent)
    }

    pub fn withdraw_fee(&self, amount: u128) -> Result<u128> {
        percent_of(amount, self.params.withdraw_fee_percent)
    }
}

/// `amount * percent / MAX_FEE_PERCENTAGE`, truncating
pub fn percent_of(amount: u128, percent: u32) -> Result<u128> {
    Ok(mul_div(amount, u128::from(percent), MAX_FEE_PERCENTAGE)?)
}

//! Fee parameters in engine units

use common::{MAX_FEE_PERCENTAGE, PRECISION_DECIMALS};
use config::defaults::*;
use serde::{Deserialize, Serialize};

use crate::error::{FeeError, Result};
use crate::funding::FUNDING_RATE_SCALE;

/// Fee configuration
///
/// Percentages are over `MAX_FEE_PERCENTAGE`. The premium threshold is kept
/// as a collateral ratio in `PRECISION_DECIMALS` units so it compares
/// directly against [`crate::collateral_ratio`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
    pub deposit_fee_percent: u32,
    pub withdraw_fee_percent: u32,
    pub open_fee_percent: u32,
    pub close_fee_percent: u32,
    pub close_max_fee_percent: u32,
    pub close_decay_period: u64,
    pub premium_max_percent: u32,
    pub premium_min_collateral_ratio: u128,
    pub premium_coefficient: u32,
    pub turbulence_step_percent: u32,
    pub turbulence_max_percent: u32,
    pub turbulence_noise_floor_percent: u32,
    pub turbulence_heartbeat: u64,
    pub funding_min_rate: u64,
    pub funding_max_rate: u64,
}

impl Default for FeeParameters {
    fn default() -> Self {
        Self {
            deposit_fee_percent: 0,
            withdraw_fee_percent: 0,
            open_fee_percent: default_open_fee_percent(),
            close_fee_percent: default_close_fee_percent(),
            close_max_fee_percent: default_close_max_fee_percent(),
            close_decay_period: default_close_decay_period_seconds(),
            premium_max_percent: default_premium_max_percent(),
            premium_min_collateral_ratio: ratio_from_percent(default_premium_min_collateral_ratio_percent()),
            premium_coefficient: default_premium_coefficient(),
            turbulence_step_percent: default_turbulence_step_percent(),
            turbulence_max_percent: default_turbulence_max_percent(),
            turbulence_noise_floor_percent: default_turbulence_step_percent(),
            turbulence_heartbeat: default_turbulence_heartbeat_seconds(),
            funding_min_rate: default_funding_min_rate(),
            funding_max_rate: default_funding_max_rate(),
        }
    }
}

impl From<&config::FeesConfig> for FeeParameters {
    fn from(config: &config::FeesConfig) -> Self {
        Self {
            deposit_fee_percent: config.deposit_fee_percent,
            withdraw_fee_percent: config.withdraw_fee_percent,
            open_fee_percent: config.open_fee_percent,
            close_fee_percent: config.close.fee_percent,
            close_max_fee_percent: config.close.max_fee_percent,
            close_decay_period: config.close.decay_period_seconds,
            premium_max_percent: config.premium.max_percent,
            premium_min_collateral_ratio: ratio_from_percent(config.premium.min_collateral_ratio_percent),
            premium_coefficient: config.premium.coefficient,
            turbulence_step_percent: config.turbulence.step_percent,
            turbulence_max_percent: config.turbulence.max_percent,
            turbulence_noise_floor_percent: config
                .turbulence
                .noise_floor_percent
                .unwrap_or(config.turbulence.step_percent),
            turbulence_heartbeat: config.turbulence.heartbeat_seconds,
            funding_min_rate: config.funding.min_rate,
            funding_max_rate: config.funding.max_rate,
        }
    }
}

fn ratio_from_percent(percent: u32) -> u128 {
    u128::from(percent) * PRECISION_DECIMALS / MAX_FEE_PERCENTAGE
}

impl FeeParameters {
    /// Reject parameters outside their scales
    pub fn validate(&self) -> Result<()> {
        let percents = [
            ("deposit_fee_percent", self.deposit_fee_percent),
            ("withdraw_fee_percent", self.withdraw_fee_percent),
            ("open_fee_percent", self.open_fee_percent),
            ("close_fee_percent", self.close_fee_percent),
            ("close_max_fee_percent", self.close_max_fee_percent),
            ("premium_max_percent", self.premium_max_percent),
            ("turbulence_step_percent", self.turbulence_step_percent),
            ("turbulence_max_percent", self.turbulence_max_percent),
        ];
        for (name, value) in percents {
            if u128::from(value) > MAX_FEE_PERCENTAGE {
                return Err(FeeError::InvalidParameter(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_FEE_PERCENTAGE, value
                )));
            }
        }

        if self.close_max_fee_percent < self.close_fee_percent {
            return Err(FeeError::InvalidParameter(
                "close_max_fee_percent must be >= close_fee_percent".to_string(),
            ));
        }
        if self.premium_min_collateral_ratio >= PRECISION_DECIMALS {
            return Err(FeeError::InvalidParameter(
                "premium_min_collateral_ratio must be below 1.0".to_string(),
            ));
        }
        if self.funding_min_rate > self.funding_max_rate || self.funding_max_rate > FUNDING_RATE_SCALE {
            return Err(FeeError::InvalidParameter(format!(
                "funding rates must satisfy min <= max <= {}",
                FUNDING_RATE_SCALE
            )));
        }

        Ok(())
    }
}

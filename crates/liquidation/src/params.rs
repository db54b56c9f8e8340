use common::MAX_LEVERAGE;
use config::defaults::*;
use serde::{Deserialize, Serialize};

use crate::error::{LiquidationError, Result};

/// Denominator of liquidation percentages (1000 == 100%)
pub const LIQUIDATION_MAX_FEE_PERCENTAGE: u32 = 1_000;

const TIERS: usize = MAX_LEVERAGE as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationParameters {
    pub min_reward_percent: u32,
    /// Balance below `units * threshold / 1000` is liquidable
    pub threshold_percents: [u32; TIERS],
    pub max_reward_percents: [u32; TIERS],
}

impl Default for LiquidationParameters {
    fn default() -> Self {
        Self {
            min_reward_percent: default_liquidation_min_reward_percent(),
            threshold_percents: default_liquidation_threshold_percents(),
            max_reward_percents: default_liquidation_max_reward_percents(),
        }
    }
}

impl From<&config::LiquidationConfig> for LiquidationParameters {
    fn from(config: &config::LiquidationConfig) -> Self {
        Self {
            min_reward_percent: config.min_reward_percent,
            threshold_percents: config.threshold_percents,
            max_reward_percents: config.max_reward_percents,
        }
    }
}

impl LiquidationParameters {
    pub fn validate(&self) -> Result<()> {
        if self.min_reward_percent > LIQUIDATION_MAX_FEE_PERCENTAGE {
            return Err(LiquidationError::InvalidParameter(
                "min_reward_percent exceeds 100%".to_string(),
            ));
        }
        if self.threshold_percents.windows(2).any(|w| w[1] < w[0]) {
            return Err(LiquidationError::InvalidParameter(
                "threshold_percents must be non-decreasing".to_string(),
            ));
        }
        for (tier, (threshold, max_reward)) in self
            .threshold_percents
            .iter()
            .zip(self.max_reward_percents.iter())
            .enumerate()
        {
            if *threshold > LIQUIDATION_MAX_FEE_PERCENTAGE || *max_reward > LIQUIDATION_MAX_FEE_PERCENTAGE {
                return Err(LiquidationError::InvalidParameter(format!(
                    "leverage {} percentages exceed 100%",
                    tier + 1
                )));
            }
            if *max_reward < self.min_reward_percent {
                return Err(LiquidationError::InvalidParameter(format!(
                    "leverage {} max reward is below the min reward",
                    tier + 1
                )));
            }
        }
        Ok(())
    }

    /// Table slot for a leverage in `1..=MAX_LEVERAGE`
    pub fn tier(leverage: u8) -> Result<usize> {
        if leverage == 0 || leverage > MAX_LEVERAGE {
            return Err(LiquidationError::InvalidLeverage(leverage));
        }
        Ok(usize::from(leverage - 1))
    }
}

use common::mul_div;
use tracing::debug;

use crate::error::{LiquidationError, Result};
use crate::params::{LiquidationParameters, LIQUIDATION_MAX_FEE_PERCENTAGE};

pub struct LiquidationCalculator {
    params: LiquidationParameters,
    max_index_value: u64,
}

impl LiquidationCalculator {
    pub fn new(params: LiquidationParameters, max_index_value: u64) -> Self {
        Self {
            params,
            max_index_value,
        }
    }

    pub fn params(&self) -> &LiquidationParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: LiquidationParameters) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Balance below which a position at `leverage` may be liquidated
    pub fn threshold(&self, position_units: u128, leverage: u8) -> Result<u128> {
        let tier = LiquidationParameters::tier(leverage)?;
        Ok(mul_div(
            position_units,
            u128::from(self.params.threshold_percents[tier]),
            u128::from(LIQUIDATION_MAX_FEE_PERCENTAGE),
        )?)
    }

    pub fn is_liquidation_candidate(
        &self,
        balance: u128,
        is_positive: bool,
        position_units: u128,
        leverage: u8,
    ) -> Result<bool> {
        if !is_positive {
            return Ok(true);
        }
        Ok(balance < self.threshold(position_units, leverage)?)
    }

    /// Reward paid to the liquidator
    ///
    /// Based on the leveraged notional at open: negative balances and
    /// balances under the floor pay the floor, balances over the tier cap
    /// pay the cap, anything in between pays the balance itself.
    pub fn liquidation_reward(
        &self,
        balance: u128,
        is_positive: bool,
        position_units: u128,
        leverage: u8,
        open_index_value: u64,
    ) -> Result<u128> {
        let tier = LiquidationParameters::tier(leverage)?;
        if self.max_index_value == 0 {
            return Err(LiquidationError::InvalidParameter("max_index_value is zero".to_string()));
        }

        let base = mul_div(
            position_units,
            u128::from(open_index_value),
            u128::from(self.max_index_value),
        )?;
        let scale = u128::from(LIQUIDATION_MAX_FEE_PERCENTAGE);
        let floor = mul_div(base, u128::from(self.params.min_reward_percent), scale)?;
        let cap = mul_div(base, u128::from(self.params.max_reward_percents[tier]), scale)?;

        let reward = if !is_positive || balance < floor {
            floor
        } else if balance <= cap {
            balance
        } else {
            cap
        };

        debug!(balance, is_positive, floor, cap, reward, "Liquidation reward computed");
        Ok(reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn calculator() -> LiquidationCalculator {
        LiquidationCalculator::new(LiquidationParameters::default(), 20_000)
    }

    #[test]
    fn test_threshold_by_tier() {
        let calc = calculator();
        assert_eq!(calc.threshold(1_000_000, 1), Ok(50_000));
        assert_eq!(calc.threshold(1_000_000, 3), Ok(100_000));
        assert_eq!(calc.threshold(1_000_000, 8), Ok(200_000));
        assert_matches!(calc.threshold(1_000_000, 9), Err(LiquidationError::InvalidLeverage(9)));
    }

    #[test]
    fn test_candidate_rules() {
        let calc = calculator();
        assert_eq!(calc.is_liquidation_candidate(u128::MAX, false, 1_000_000, 1), Ok(true));
        assert_eq!(calc.is_liquidation_candidate(49_999, true, 1_000_000, 1), Ok(true));
        assert_eq!(calc.is_liquidation_candidate(50_000, true, 1_000_000, 1), Ok(false));
    }

    // base = 4_000_000 * 5000 / 20000 = 1_000_000, floor 5_000, cap 30_000
    #[test]
    fn test_reward_three_branch_clamp() {
        let calc = calculator();
        let reward = |balance, positive| calc.liquidation_reward(balance, positive, 4_000_000, 2, 5_000).unwrap();

        assert_eq!(reward(0, false), 5_000);
        assert_eq!(reward(1_000_000, false), 5_000);
        assert_eq!(reward(4_999, true), 5_000);
        assert_eq!(reward(5_000, true), 5_000);
        assert_eq!(reward(17_000, true), 17_000);
        assert_eq!(reward(30_000, true), 30_000);
        assert_eq!(reward(30_001, true), 30_000);
    }

    #[test]
    fn test_reward_stays_within_floor_and_cap() {
        let calc = calculator();
        for leverage in 1..=8u8 {
            for balance in [0u128, 1, 4_999, 5_000, 12_345, 30_000, 99_999_999] {
                for positive in [true, false] {
                    let reward = calc
                        .liquidation_reward(balance, positive, 4_000_000, leverage, 5_000)
                        .unwrap();
                    assert!((5_000..=30_000).contains(&reward));
                    if !positive {
                        assert_eq!(reward, 5_000);
                    }
                }
            }
        }
    }

    #[test]
    fn test_set_parameters_validates() {
        let mut calc = calculator();
        let params = LiquidationParameters {
            min_reward_percent: 50,
            ..Default::default()
        };
        assert_matches!(calc.set_parameters(params), Err(LiquidationError::InvalidParameter(_)));
        assert_eq!(calc.params(), &LiquidationParameters::default());
    }
}

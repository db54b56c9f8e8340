//! Collateral-ratio premium fee
//!
//! The pool charges a premium when an open pushes its collateral ratio
//! (position units over pooled collateral) past a threshold. The percent
//! grows with the inverse square of the distance to a fully used pool and
//! saturates at the configured maximum.

use common::{mul_div, MathError, MAX_FEE_PERCENTAGE, PRECISION_DECIMALS};
use serde::{Deserialize, Serialize};

/// Premium charged on one open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumFee {
    pub fee: u128,
    /// Combined premium and turbulence percent over `MAX_FEE_PERCENTAGE`
    pub percent: u32,
}

/// `total_units / pooled` in `PRECISION_DECIMALS` units; zero for an empty pool
pub fn collateral_ratio(total_units: u128, pooled: u128) -> Result<u128, MathError> {
    if pooled == 0 {
        return Ok(0);
    }
    mul_div(total_units, PRECISION_DECIMALS, pooled)
}

/// Premium percent for a collateral ratio, before pro-rating and turbulence
pub(crate) fn ratio_percent(
    ratio: u128,
    min_ratio: u128,
    coefficient: u32,
    max_percent: u32,
) -> Result<u32, MathError> {
    if ratio < min_ratio {
        return Ok(0);
    }
    if ratio >= PRECISION_DECIMALS {
        return Ok(max_percent);
    }

    let distance = PRECISION_DECIMALS - ratio;
    let numerator = u128::from(coefficient)
        .checked_mul(PRECISION_DECIMALS)
        .and_then(|v| v.checked_mul(PRECISION_DECIMALS))
        .ok_or(MathError::Overflow)?;
    let denominator = distance.checked_mul(distance).ok_or(MathError::Overflow)?;

    Ok((numerator / denominator).min(u128::from(max_percent)) as u32)
}

/// Premium on `amount` for an open that moves the ratio from `before` to `after`
///
/// Crossing the threshold only charges for the share of the move above it.
pub(crate) fn premium_fee(
    amount: u128,
    before: u128,
    after: u128,
    turbulence: u32,
    min_ratio: u128,
    coefficient: u32,
    max_percent: u32,
) -> Result<PremiumFee, MathError> {
    let mut percent = ratio_percent(after, min_ratio, coefficient, max_percent)?;

    if before < min_ratio && min_ratio < after {
        percent = mul_div(u128::from(percent), after - min_ratio, after - before)? as u32;
    }

    let combined = percent.saturating_add(turbulence).min(max_percent);
    let fee = mul_div(amount, u128::from(combined), MAX_FEE_PERCENTAGE)?;

    Ok(PremiumFee {
        fee,
        percent: combined,
    })
}

//! Funding-rate table and single-unit funding fee
//!
//! The rate is a daily percentage over [`FUNDING_RATE_SCALE`] keyed by the
//! index bucket `index / 100`. Below bucket 55 the rate is flat at the
//! maximum, from bucket 150 flat at the minimum. In between it halves every
//! five buckets, with [`FUNDING_COEFFICIENTS`] filling the steps inside each
//! halving. Every division truncates, in the order written.

use common::{MathError, PRECISION_DECIMALS, SECONDS_PER_DAY};

/// Funding rates are over this scale (1_000_000 == 100% per day)
pub const FUNDING_RATE_SCALE: u64 = 1_000_000;

const INDEX_BUCKET_SIZE: u64 = 100;
const MAX_RATE_BUCKET: u64 = 55;
const MIN_RATE_BUCKET: u64 = 150;
const BUCKETS_PER_HALVING: u64 = 5;

/// `100000 * 2^(k/5)` rounded, for k in 0..5
pub const FUNDING_COEFFICIENTS: [u128; 5] = [100_000, 114_869, 131_950, 151_571, 174_110];

/// Daily funding rate for `index`
pub fn funding_rate(index: u64, min_rate: u64, max_rate: u64) -> u64 {
    let bucket = index / INDEX_BUCKET_SIZE;

    if bucket <= MAX_RATE_BUCKET {
        return max_rate;
    }
    if bucket >= MIN_RATE_BUCKET {
        return min_rate;
    }

    let exponent = (bucket - MAX_RATE_BUCKET) / BUCKETS_PER_HALVING;
    let step = ((bucket - MAX_RATE_BUCKET) % BUCKETS_PER_HALVING) as usize;

    let decayed = PRECISION_DECIMALS / (1u128 << exponent) / FUNDING_COEFFICIENTS[step];
    let rate = decayed.saturating_add(u128::from(min_rate));

    // bounded by max_rate, so the narrowing is lossless
    rate.min(u128::from(max_rate)) as u64
}

/// Funding fee owed by one position unit held for `period` seconds at `index`
///
/// `PRECISION * index * rate * period / SECONDS_PER_DAY / max_index / FUNDING_RATE_SCALE`
pub fn single_unit_funding_fee(
    index: u64,
    period: u64,
    max_index: u64,
    min_rate: u64,
    max_rate: u64,
) -> Result<u128, MathError> {
    if index == 0 || period == 0 {
        return Ok(0);
    }
    if max_index == 0 {
        return Err(MathError::DivisionByZero);
    }

    let rate = funding_rate(index, min_rate, max_rate);

    let numerator = PRECISION_DECIMALS
        .checked_mul(u128::from(index))
        .and_then(|v| v.checked_mul(u128::from(rate)))
        .and_then(|v| v.checked_mul(u128::from(period)))
        .ok_or(MathError::Overflow)?;

    Ok(numerator
        / u128::from(SECONDS_PER_DAY)
        / u128::from(max_index)
        / u128::from(FUNDING_RATE_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 2_000;
    const MAX: u64 = 100_000;

    fn rate_at_bucket(bucket: u64) -> u64 {
        funding_rate(bucket * 100, MIN, MAX)
    }

    #[test]
    fn test_flat_regions() {
        assert_eq!(rate_at_bucket(0), MAX);
        assert_eq!(rate_at_bucket(50), MAX);
        assert_eq!(rate_at_bucket(55), MAX);
        assert_eq!(funding_rate(5_599, MIN, MAX), MAX);
        assert_eq!(rate_at_bucket(150), MIN);
        assert_eq!(rate_at_bucket(200), MIN);
    }

    #[test]
    fn test_golden_table_values() {
        assert_eq!(rate_at_bucket(56), 89_055);
        assert_eq!(rate_at_bucket(57), 77_786);
        assert_eq!(rate_at_bucket(58), 67_975);
        assert_eq!(rate_at_bucket(59), 59_434);
        assert_eq!(rate_at_bucket(60), 52_000);
        assert_eq!(rate_at_bucket(65), 27_000);
        assert_eq!(rate_at_bucket(70), 14_500);
        assert_eq!(rate_at_bucket(100), 2_195);
        assert_eq!(rate_at_bucket(149), MIN);
    }

    #[test]
    fn test_rate_is_monotone_non_increasing() {
        let mut previous = u64::MAX;
        for index in (0..=20_000).step_by(25) {
            let rate = funding_rate(index, MIN, MAX);
            assert!(rate <= previous, "rate increased at index {}", index);
            previous = rate;
        }
    }

    #[test]
    fn test_zero_inputs_accrue_nothing() {
        assert_eq!(single_unit_funding_fee(0, 86_400, 20_000, MIN, MAX), Ok(0));
        assert_eq!(single_unit_funding_fee(5_000, 0, 20_000, MIN, MAX), Ok(0));
    }

    #[test]
    fn test_single_unit_fee_one_day_at_bucket_50() {
        // 1e10 * 5000 * 100000 * 86400 / 86400 / 20000 / 1e6
        assert_eq!(
            single_unit_funding_fee(5_000, 86_400, 20_000, MIN, MAX),
            Ok(250_000_000)
        );
    }

    #[test]
    fn test_single_unit_fee_truncates_in_order() {
        // 1e10 * 5000 * 100000 * 7 = 3.5e19; / 86400 = 405092592592592;
        // / 20000 = 20254629629; / 1e6 = 20254
        assert_eq!(single_unit_funding_fee(5_000, 7, 20_000, MIN, MAX), Ok(20_254));
    }
}

//! Checked fixed-point helpers
//!
//! Every ledger quantity is an unsigned integer in some fixed scale. The
//! rounding direction of a division is part of the contract of the caller,
//! so the two helpers here name it explicitly.

use thiserror::Error;

/// Arithmetic failure in a fixed-point computation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// An intermediate product or sum does not fit in 128 bits
    #[error("Math overflow")]
    Overflow,

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,
}

/// `a * b / c`, truncating towards zero
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    a.checked_mul(b).map(|p| p / c).ok_or(MathError::Overflow)
}

/// `a * b / c`, rounding up
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product / c;
    if product % c == 0 {
        Ok(quotient)
    } else {
        quotient.checked_add(1).ok_or(MathError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 10, 3), Ok(33));
        assert_eq!(mul_div(0, 10, 3), Ok(0));
    }

    #[test]
    fn test_mul_div_ceil_rounds_up_only_on_remainder() {
        assert_eq!(mul_div_ceil(10, 10, 3), Ok(34));
        assert_eq!(mul_div_ceil(9, 10, 3), Ok(30));
    }

    #[test]
    fn test_division_by_zero_and_overflow() {
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div_ceil(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(MathError::Overflow));
    }
}

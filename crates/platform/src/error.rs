//! Platform error types

use common::{Account, MathError, Timestamp};
use fee_model::FeeError;
use index_oracle::OracleError;
use liquidation::LiquidationError;
use thiserror::Error;

use crate::transfer::TransferError;

/// Errors returned by platform operations
///
/// Every error leaves the platform exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Invalid leverage {leverage}, allowed 1..={max}")]
    InvalidLeverage { leverage: u8, max: u8 },

    #[error("Invalid index bound: {0}")]
    InvalidIndexBound(u64),

    #[error("Index {index} is above the acceptable maximum {max_acceptable}")]
    PriceTooHigh { index: u64, max_acceptable: u64 },

    #[error("Index {index} is below the acceptable minimum {min_acceptable}")]
    PriceTooLow { index: u64, min_acceptable: u64 },

    #[error("Insufficient pool liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient LP tokens: requested {requested}, available {available}")]
    InsufficientLpTokens { requested: u128, available: u128 },

    #[error("LP burn {required} exceeds the limit {max}")]
    LpBurnExceedsLimit { required: u128, max: u128 },

    #[error("No position for {0}")]
    NoPosition(Account),

    #[error("Invalid position units: requested {requested}, held {held}")]
    InvalidUnits { requested: u128, held: u128 },

    #[error("Position of {0} has a negative balance")]
    NegativeBalance(Account),

    #[error("Fees {fees} exceed collateral {collateral}")]
    FeesExceedCollateral { collateral: u128, fees: u128 },

    #[error("LP lockup has not expired, unlocks at {unlock_at}")]
    LockupNotExpired { unlock_at: Timestamp },

    #[error("None of the given positions can be liquidated")]
    NoLiquidablePosition,

    #[error("Deposit too small to mint LP tokens")]
    TooFewLpTokens,

    #[error("Account {0} is not allowed to perform this action")]
    Unauthorized(Account),

    #[error("Clock moved backwards: now {now}, latest snapshot {latest}")]
    TimestampRegression { now: Timestamp, latest: Timestamp },

    #[error("No snapshot recorded at {0}")]
    MissingSnapshot(Timestamp),

    #[error("Math overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Liquidation error: {0}")]
    Liquidation(#[from] LiquidationError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl From<MathError> for PlatformError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Overflow => PlatformError::MathOverflow,
            MathError::DivisionByZero => PlatformError::DivisionByZero,
        }
    }
}

/// Error classes callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    /// Caller-supplied index bound violated; safe to retry with new bounds
    PriceGuard,
    InsufficientState,
    Oracle,
    Authorization,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputValidation => "input_validation",
            ErrorKind::PriceGuard => "price_guard",
            ErrorKind::InsufficientState => "insufficient_state",
            ErrorKind::Oracle => "oracle",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Internal => "internal",
        }
    }
}

impl PlatformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::InvalidAmount
            | PlatformError::InvalidLeverage { .. }
            | PlatformError::InvalidIndexBound(_)
            | PlatformError::InvalidUnits { .. }
            | PlatformError::FeesExceedCollateral { .. }
            | PlatformError::TooFewLpTokens
            | PlatformError::Config(_) => ErrorKind::InputValidation,

            PlatformError::PriceTooHigh { .. } | PlatformError::PriceTooLow { .. } => ErrorKind::PriceGuard,

            PlatformError::InsufficientLiquidity
            | PlatformError::InsufficientLpTokens { .. }
            | PlatformError::LpBurnExceedsLimit { .. }
            | PlatformError::NoPosition(_)
            | PlatformError::NegativeBalance(_)
            | PlatformError::LockupNotExpired { .. }
            | PlatformError::NoLiquidablePosition => ErrorKind::InsufficientState,

            PlatformError::Transfer(TransferError::InsufficientBalance { .. }) => ErrorKind::InsufficientState,

            PlatformError::Oracle(_) => ErrorKind::Oracle,

            PlatformError::Unauthorized(_) | PlatformError::Fee(FeeError::UnauthorizedUpdater(_)) => {
                ErrorKind::Authorization
            }

            PlatformError::Fee(FeeError::InvalidParameter(_))
            | PlatformError::Liquidation(LiquidationError::InvalidParameter(_))
            | PlatformError::Liquidation(LiquidationError::InvalidLeverage(_)) => ErrorKind::InputValidation,

            PlatformError::TimestampRegression { .. }
            | PlatformError::MissingSnapshot(_)
            | PlatformError::MathOverflow
            | PlatformError::DivisionByZero
            | PlatformError::Fee(FeeError::Math(_))
            | PlatformError::Liquidation(LiquidationError::Math(_))
            | PlatformError::Transfer(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PlatformError::InvalidAmount.kind(), ErrorKind::InputValidation);
        assert_eq!(
            PlatformError::PriceTooHigh {
                index: 2,
                max_acceptable: 1
            }
            .kind(),
            ErrorKind::PriceGuard
        );
        assert_eq!(PlatformError::NoLiquidablePosition.kind(), ErrorKind::InsufficientState);
        assert_eq!(
            PlatformError::from(OracleError::StaleRound { latest: 1, recorded: 2 }).kind(),
            ErrorKind::Oracle
        );
        assert_eq!(
            PlatformError::Unauthorized(Account::new("eve").unwrap()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(PlatformError::from(MathError::Overflow), PlatformError::MathOverflow);
        assert_eq!(PlatformError::MathOverflow.kind().as_str(), "internal");
    }
}

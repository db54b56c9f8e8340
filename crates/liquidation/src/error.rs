//! Liquidation error types

use common::MathError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiquidationError {
    #[error("Invalid leverage: {0}")]
    InvalidLeverage(u8),

    #[error("Invalid liquidation parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, LiquidationError>;

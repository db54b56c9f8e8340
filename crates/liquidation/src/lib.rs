//! Liquidation rules for Volx positions
//!
//! Both checks are pure functions of a position's current balance. Tables
//! are indexed by leverage tier (`leverage - 1`).

pub mod calculator;
pub mod error;
pub mod params;

pub use calculator::LiquidationCalculator;
pub use error::{LiquidationError, Result};
pub use params::{LiquidationParameters, LIQUIDATION_MAX_FEE_PERCENTAGE};

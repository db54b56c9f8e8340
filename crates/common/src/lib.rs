//! Common types and utilities for Volx
//!
//! This crate provides shared types, traits, and utilities used across
//! all Volx crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (Account, Timestamp, scale constants)
//! - [`math`] - Checked fixed-point helpers with explicit rounding direction
//! - [`clock`] - Wall-clock abstraction used by the platform

pub mod clock;
pub mod error;
pub mod math;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use math::{mul_div, mul_div_ceil, MathError};
pub use types::*;

//! Fee pricing for Volx
//!
//! - [`funding`] - funding-rate table and single-unit funding fee
//! - [`premium`] - collateral-ratio premium fee
//! - [`turbulence`] - inter-round turbulence indicator
//! - [`model`] - [`FeeModel`], the stateful calculator the platform owns

pub mod error;
pub mod funding;
pub mod model;
pub mod params;
pub mod premium;
pub mod turbulence;

pub use error::{FeeError, Result};
pub use funding::{funding_rate, single_unit_funding_fee, FUNDING_RATE_SCALE};
pub use model::{percent_of, FeeModel, PendingTurbulence};
pub use params::FeeParameters;
pub use premium::{collateral_ratio, PremiumFee};
pub use turbulence::{turbulence_after, InterRoundPeriods, TurbulenceLimits};

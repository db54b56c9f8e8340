//! Volatility index oracle for Volx
//!
//! Raw feeds implement [`IndexFeed`] and publish signed answers. The
//! [`ClampedIndexOracle`] turns them into [`IndexRound`]s the platform can
//! price against: values are truncated to the configured maximum, must be
//! strictly positive, and may be cross-checked against a sanity feed.

pub mod clamped;
pub mod error;
pub mod feed;
pub mod types;

pub use clamped::ClampedIndexOracle;
pub use error::{OracleError, Result};
pub use feed::{IndexFeed, IndexOracle, InMemoryIndexFeed};
pub use types::{FeedRound, IndexRound, RoundId};

//! Leveraged volatility-index pool for Volx
//!
//! Liquidity providers deposit collateral and receive LP tokens. Traders
//! open leveraged positions priced against a volatility index; open
//! positions pay funding fees to the pool.
//!
//! # Modules
//!
//! - [`engine`] - [`Platform`], the single-writer state machine
//! - [`client`] - [`PlatformHandle`], a shareable async wrapper
//! - [`snapshot`] - cumulative funding-fee ledger
//! - [`position`] - position book and balance settlement
//! - [`pool`] - pool aggregates and LP balances
//! - [`transfer`] - collateral token seam
//! - [`event`] / [`log`] - ordered event log

pub mod client;
pub mod engine;
pub mod error;
pub mod event;
pub mod log;
pub mod pool;
pub mod position;
pub mod snapshot;
pub mod transfer;

pub use client::PlatformHandle;
pub use engine::{
    CloseResult, Collaborators, LiquidationOutcome, OpenResult, Platform, PlatformSettings, WithdrawResult,
};
pub use error::{ErrorKind, PlatformError, Result};
pub use event::PlatformEvent;
pub use log::EventLog;
pub use pool::{PoolLedger, PoolState};
pub use position::{Position, PositionBalance, PositionBook};
pub use snapshot::{Snapshot, SnapshotLedger, SnapshotUpdate};
pub use transfer::{CollateralTransfer, InMemoryCollateralLedger, TransferError};

//! Events recorded by the platform
//!
//! Every committed state change appends one or more events, in the order
//! the changes were applied.

use common::{Account, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    SnapshotRecorded {
        sequence: u64,
        timestamp: Timestamp,
        cumulative_fee_per_unit: u128,
        round_id: u64,
        index_value: u64,
        turbulence: u32,
    },

    Deposit {
        sequence: u64,
        account: Account,
        token_amount: u128,
        lp_minted: u128,
        fee: u128,
    },

    Withdraw {
        sequence: u64,
        account: Account,
        token_amount: u128,
        lp_burned: u128,
        fee: u128,
        tokens_out: u128,
    },

    OpenPosition {
        sequence: u64,
        account: Account,
        collateral_in: u128,
        leverage: u8,
        index_value: u64,
        open_fee: u128,
        premium_fee: u128,
        premium_percent: u32,
        position_units: u128,
        merged: bool,
    },

    ClosePosition {
        sequence: u64,
        account: Account,
        units_closed: u128,
        index_value: u64,
        close_fee: u128,
        close_fee_percent: u32,
        tokens_out: u128,
        remaining_units: u128,
    },

    LiquidatePosition {
        sequence: u64,
        account: Account,
        balance: u128,
        is_positive: bool,
        position_units: u128,
        leverage: u8,
    },

    LiquidationReward {
        sequence: u64,
        caller: Account,
        amount: u128,
        positions: usize,
    },

    /// Owner changed a runtime parameter
    ParameterUpdated {
        sequence: u64,
        name: String,
        value: String,
    },
}

impl PlatformEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            PlatformEvent::SnapshotRecorded { sequence, .. } => *sequence,
            PlatformEvent::Deposit { sequence, .. } => *sequence,
            PlatformEvent::Withdraw { sequence, .. } => *sequence,
            PlatformEvent::OpenPosition { sequence, .. } => *sequence,
            PlatformEvent::ClosePosition { sequence, .. } => *sequence,
            PlatformEvent::LiquidatePosition { sequence, .. } => *sequence,
            PlatformEvent::LiquidationReward { sequence, .. } => *sequence,
            PlatformEvent::ParameterUpdated { sequence, .. } => *sequence,
        }
    }
}

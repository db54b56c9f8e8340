//! Oracle error types

use common::Timestamp;
use thiserror::Error;

use crate::types::RoundId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Feed answer is zero or negative after truncation
    #[error("Invalid index value: {0}")]
    InvalidIndexValue(i64),

    #[error("Deviation between primary ({primary}) and sanity ({sanity}) feeds exceeds {max_percent}")]
    DeviationTooLarge {
        primary: u64,
        sanity: u64,
        max_percent: u32,
    },

    /// Latest round is older than one the consumer already used
    #[error("Stale round: latest round {latest} is older than recorded round {recorded}")]
    StaleRound { latest: RoundId, recorded: RoundId },

    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Feed has not published any round")]
    NoRounds,

    #[error("Round {round_id} at {timestamp} does not follow the previous round")]
    NonMonotonicRound {
        round_id: RoundId,
        timestamp: Timestamp,
    },
}

pub type Result<T> = std::result::Result<T, OracleError>;

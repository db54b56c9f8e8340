use common::Timestamp;
use serde::{Deserialize, Serialize};

pub type RoundId = u64;

/// Round as published by a raw feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRound {
    pub round_id: RoundId,
    pub answer: i64,
    pub timestamp: Timestamp,
}

/// Validated index value with two implied decimals (5000 == 50.00)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRound {
    pub round_id: RoundId,
    pub value: u64,
    pub timestamp: Timestamp,
}

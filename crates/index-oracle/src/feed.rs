use std::sync::Arc;

use common::Timestamp;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{OracleError, Result};
use crate::types::{FeedRound, IndexRound, RoundId};

/// Source of raw index rounds
#[cfg_attr(test, mockall::automock)]
pub trait IndexFeed: Send + Sync {
    fn latest_round(&self) -> Result<FeedRound>;

    fn round(&self, round_id: RoundId) -> Result<FeedRound>;
}

/// Validated index rounds consumed by the platform
pub trait IndexOracle: Send + Sync {
    fn latest_round(&self) -> Result<IndexRound>;

    fn round(&self, round_id: RoundId) -> Result<IndexRound>;

    /// Upper bound every returned value is truncated to
    fn max_index_value(&self) -> u64;
}

/// Feed backed by an in-process round list
///
/// Clones share the same rounds, so a simulation can publish through one
/// handle while the oracle reads through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexFeed {
    rounds: Arc<RwLock<Vec<FeedRound>>>,
}

impl InMemoryIndexFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the next round; ids start at 1 and timestamps must increase
    pub fn publish(&self, answer: i64, timestamp: Timestamp) -> Result<RoundId> {
        let mut rounds = self.rounds.write();
        let round_id = rounds.last().map_or(1, |r| r.round_id + 1);

        if let Some(last) = rounds.last() {
            if timestamp <= last.timestamp {
                return Err(OracleError::NonMonotonicRound {
                    round_id,
                    timestamp,
                });
            }
        }

        rounds.push(FeedRound {
            round_id,
            answer,
            timestamp,
        });
        debug!(round_id, answer, timestamp, "Index round published");
        Ok(round_id)
    }

    pub fn round_count(&self) -> usize {
        self.rounds.read().len()
    }
}

impl IndexFeed for InMemoryIndexFeed {
    fn latest_round(&self) -> Result<FeedRound> {
        self.rounds.read().last().copied().ok_or(OracleError::NoRounds)
    }

    fn round(&self, round_id: RoundId) -> Result<FeedRound> {
        let rounds = self.rounds.read();
        rounds
            .binary_search_by_key(&round_id, |r| r.round_id)
            .map(|i| rounds[i])
            .map_err(|_| OracleError::RoundNotFound(round_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_publish_assigns_sequential_ids() {
        let feed = InMemoryIndexFeed::new();
        assert_eq!(feed.publish(5000, 100).unwrap(), 1);
        assert_eq!(feed.publish(5100, 200).unwrap(), 2);

        let latest = feed.latest_round().unwrap();
        assert_eq!(latest.round_id, 2);
        assert_eq!(latest.answer, 5100);
        assert_eq!(feed.round(1).unwrap().timestamp, 100);
    }

    #[test]
    fn test_publish_rejects_non_increasing_timestamp() {
        let feed = InMemoryIndexFeed::new();
        feed.publish(5000, 100).unwrap();
        assert_matches!(
            feed.publish(5000, 100),
            Err(OracleError::NonMonotonicRound { round_id: 2, .. })
        );
        assert_eq!(feed.round_count(), 1);
    }

    #[test]
    fn test_empty_feed_and_missing_round() {
        let feed = InMemoryIndexFeed::new();
        assert_matches!(feed.latest_round(), Err(OracleError::NoRounds));
        assert_matches!(feed.round(3), Err(OracleError::RoundNotFound(3)));
    }

    #[test]
    fn test_clones_share_rounds() {
        let feed = InMemoryIndexFeed::new();
        let reader = feed.clone();
        feed.publish(7000, 10).unwrap();
        assert_eq!(reader.latest_round().unwrap().answer, 7000);
    }
}

use std::sync::Arc;

use config::OracleConfig;
use tracing::{debug, warn};

use crate::error::{OracleError, Result};
use crate::feed::{IndexFeed, IndexOracle};
use crate::types::{FeedRound, IndexRound, RoundId};

const DEVIATION_SCALE: u128 = 10_000;

/// Oracle that truncates feed answers to `max_index_value` and optionally
/// checks the latest answer against a sanity feed
pub struct ClampedIndexOracle {
    primary: Arc<dyn IndexFeed>,
    sanity: Option<Arc<dyn IndexFeed>>,
    max_index_value: u64,
    max_deviation_percent: Option<u32>,
}

impl ClampedIndexOracle {
    pub fn new(primary: Arc<dyn IndexFeed>, max_index_value: u64) -> Self {
        Self {
            primary,
            sanity: None,
            max_index_value,
            max_deviation_percent: None,
        }
    }

    /// Build from the `oracle` config section; the deviation limit only
    /// applies when a sanity feed is given
    pub fn from_config(
        primary: Arc<dyn IndexFeed>,
        sanity: Option<Arc<dyn IndexFeed>>,
        config: &OracleConfig,
    ) -> Self {
        Self {
            primary,
            sanity,
            max_index_value: config.max_index_value,
            max_deviation_percent: config.max_deviation_percent,
        }
    }

    /// Cross-check latest rounds against `sanity`; `max_deviation_percent`
    /// is in hundredths of a percent
    pub fn with_sanity_feed(mut self, sanity: Arc<dyn IndexFeed>, max_deviation_percent: u32) -> Self {
        self.sanity = Some(sanity);
        self.max_deviation_percent = Some(max_deviation_percent);
        self
    }

    fn clamp(&self, round: FeedRound) -> Result<IndexRound> {
        if round.answer <= 0 {
            return Err(OracleError::InvalidIndexValue(round.answer));
        }

        let raw = round.answer.unsigned_abs();
        let value = raw.min(self.max_index_value);
        if value == 0 {
            return Err(OracleError::InvalidIndexValue(round.answer));
        }
        if value < raw {
            debug!(round_id = round.round_id, raw, value, "Index value truncated");
        }

        Ok(IndexRound {
            round_id: round.round_id,
            value,
            timestamp: round.timestamp,
        })
    }

    fn check_deviation(&self, primary: &IndexRound) -> Result<()> {
        let (Some(sanity_feed), Some(max_percent)) = (&self.sanity, self.max_deviation_percent) else {
            return Ok(());
        };

        let sanity = self.clamp(sanity_feed.latest_round()?)?;
        let diff = primary.value.abs_diff(sanity.value);
        let deviation = u128::from(diff) * DEVIATION_SCALE / u128::from(primary.value);

        if deviation > u128::from(max_percent) {
            warn!(
                primary = primary.value,
                sanity = sanity.value,
                deviation = deviation as u64,
                max_percent,
                "Index feeds disagree"
            );
            return Err(OracleError::DeviationTooLarge {
                primary: primary.value,
                sanity: sanity.value,
                max_percent,
            });
        }

        Ok(())
    }
}

impl IndexOracle for ClampedIndexOracle {
    fn latest_round(&self) -> Result<IndexRound> {
        let round = self.clamp(self.primary.latest_round()?)?;
        self.check_deviation(&round)?;
        Ok(round)
    }

    fn round(&self, round_id: RoundId) -> Result<IndexRound> {
        self.clamp(self.primary.round(round_id)?)
    }

    fn max_index_value(&self) -> u64 {
        self.max_index_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{InMemoryIndexFeed, MockIndexFeed};
    use assert_matches::assert_matches;

    fn feed_with(answers: &[i64]) -> Arc<InMemoryIndexFeed> {
        let feed = InMemoryIndexFeed::new();
        for (i, answer) in answers.iter().enumerate() {
            feed.publish(*answer, 1_000 + i as u64 * 60).unwrap();
        }
        Arc::new(feed)
    }

    fn mock_latest(answer: i64) -> Arc<MockIndexFeed> {
        let mut mock = MockIndexFeed::new();
        mock.expect_latest_round().returning(move || {
            Ok(FeedRound {
                round_id: 9,
                answer,
                timestamp: 5_000,
            })
        });
        Arc::new(mock)
    }

    #[test]
    fn test_values_are_truncated_to_max() {
        let oracle = ClampedIndexOracle::new(feed_with(&[25_000]), 20_000);
        let round = oracle.latest_round().unwrap();
        assert_eq!(round.value, 20_000);
        assert_eq!(round.round_id, 1);
    }

    #[test]
    fn test_non_positive_values_are_rejected() {
        let oracle = ClampedIndexOracle::new(feed_with(&[5_000, 0, -3]), 20_000);
        assert_eq!(oracle.round(1).unwrap().value, 5_000);
        assert_matches!(oracle.round(2), Err(OracleError::InvalidIndexValue(0)));
        assert_matches!(oracle.latest_round(), Err(OracleError::InvalidIndexValue(-3)));
    }

    #[test]
    fn test_sanity_feed_within_deviation() {
        let oracle =
            ClampedIndexOracle::new(feed_with(&[10_000]), 20_000).with_sanity_feed(mock_latest(10_500), 500);
        assert_eq!(oracle.latest_round().unwrap().value, 10_000);
    }

    #[test]
    fn test_sanity_feed_deviation_too_large() {
        let oracle =
            ClampedIndexOracle::new(feed_with(&[10_000]), 20_000).with_sanity_feed(mock_latest(10_501), 500);
        assert_matches!(
            oracle.latest_round(),
            Err(OracleError::DeviationTooLarge {
                primary: 10_000,
                sanity: 10_501,
                max_percent: 500
            })
        );
    }

    #[test]
    fn test_historical_rounds_skip_sanity_check() {
        let mut sanity = MockIndexFeed::new();
        sanity.expect_latest_round().never();
        let oracle =
            ClampedIndexOracle::new(feed_with(&[10_000]), 20_000).with_sanity_feed(Arc::new(sanity), 1);
        assert_eq!(oracle.round(1).unwrap().value, 10_000);
    }

    #[test]
    fn test_from_config_without_sanity_feed() {
        let config = OracleConfig {
            max_index_value: 15_000,
            max_deviation_percent: Some(100),
        };
        let oracle = ClampedIndexOracle::from_config(feed_with(&[18_000]), None, &config);
        assert_eq!(oracle.max_index_value(), 15_000);
        assert_eq!(oracle.latest_round().unwrap().value, 15_000);
    }
}

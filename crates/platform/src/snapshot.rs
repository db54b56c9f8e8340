//! Cumulative funding-fee snapshots
//!
//! One cumulative fee-per-unit value is recorded per distinct timestamp at
//! which the platform is touched. A position settles its funding fees as
//! `units * (latest - cumulative_at(creation)) / PRECISION_DECIMALS`, so no
//! operation ever iterates over positions.
//!
//! Refreshing is split in two: [`SnapshotLedger::prepare`] computes the
//! update without touching anything and [`SnapshotLedger::commit`] applies
//! it once the surrounding operation has succeeded.

use common::{mul_div, Account, Timestamp, PRECISION_DECIMALS};
use fee_model::{FeeModel, InterRoundPeriods, PendingTurbulence};
use index_oracle::{IndexOracle, OracleError, RoundId};
use serde::Serialize;
use tracing::debug;

use crate::error::{PlatformError, Result};

/// Result of a refresh, ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUpdate {
    pub timestamp: Timestamp,
    pub cumulative_fee_per_unit: u128,
    /// Fee per unit accrued since the previous snapshot
    pub accrued_per_unit: u128,
    /// Funding fees owed by all open units for the accrual
    pub funding_fees_added: u128,
    /// Latest index value, used to price the operation
    pub index_value: u64,
    pub round_id: RoundId,
    /// False when a snapshot already exists at `timestamp`
    pub is_new: bool,
    pub turbulence: Option<PendingTurbulence>,
}

/// Latest recorded snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub cumulative_fee_per_unit: u128,
}

/// Append-only snapshot arena sorted by timestamp
#[derive(Debug, Default)]
pub struct SnapshotLedger {
    timestamps: Vec<Timestamp>,
    values: Vec<u128>,
    last_round_id: Option<RoundId>,
    last_index_value: u64,
}

impl SnapshotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        match (self.timestamps.last(), self.values.last()) {
            (Some(timestamp), Some(value)) => Some(Snapshot {
                timestamp: *timestamp,
                cumulative_fee_per_unit: *value,
            }),
            _ => None,
        }
    }

    pub fn cumulative_at(&self, timestamp: Timestamp) -> Option<u128> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|i| self.values[i])
    }

    pub fn last_round_id(&self) -> Option<RoundId> {
        self.last_round_id
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Compute the refresh for `now` without changing any state
    ///
    /// `updater` is the identity the fee model accepts turbulence samples
    /// from; `total_units` are the open position units the accrual is
    /// charged to.
    pub fn prepare(
        &self,
        now: Timestamp,
        oracle: &dyn IndexOracle,
        fee_model: &FeeModel,
        updater: &Account,
        total_units: u128,
    ) -> Result<SnapshotUpdate> {
        let latest_round = oracle.latest_round()?;

        if let Some(recorded) = self.last_round_id {
            if latest_round.round_id < recorded {
                return Err(OracleError::StaleRound {
                    latest: latest_round.round_id,
                    recorded,
                }
                .into());
            }
        }

        let Some(previous) = self.latest() else {
            return Ok(SnapshotUpdate {
                timestamp: now,
                cumulative_fee_per_unit: PRECISION_DECIMALS,
                accrued_per_unit: 0,
                funding_fees_added: 0,
                index_value: latest_round.value,
                round_id: latest_round.round_id,
                is_new: true,
                turbulence: None,
            });
        };

        if now < previous.timestamp {
            return Err(PlatformError::TimestampRegression {
                now,
                latest: previous.timestamp,
            });
        }

        if now == previous.timestamp {
            return Ok(SnapshotUpdate {
                timestamp: now,
                cumulative_fee_per_unit: previous.cumulative_fee_per_unit,
                accrued_per_unit: 0,
                funding_fees_added: 0,
                index_value: latest_round.value,
                round_id: self.last_round_id.unwrap_or(latest_round.round_id),
                is_new: false,
                turbulence: None,
            });
        }

        let recorded_round = self.last_round_id.unwrap_or(latest_round.round_id);
        let (accrued, turbulence) = if latest_round.round_id == recorded_round {
            let accrued = fee_model.single_unit_funding_fee(self.last_index_value, now - previous.timestamp)?;
            (accrued, None)
        } else {
            // only the boundary rounds matter; intermediate values are skipped
            let split = latest_round.timestamp.clamp(previous.timestamp, now);
            let before = fee_model.single_unit_funding_fee(self.last_index_value, split - previous.timestamp)?;
            let after = fee_model.single_unit_funding_fee(latest_round.value, now - split)?;

            let recorded = oracle.round(recorded_round)?;
            let new_rounds = latest_round.round_id - recorded_round;
            let periods = InterRoundPeriods::split(
                latest_round.timestamp.saturating_sub(recorded.timestamp),
                new_rounds,
            );
            let pending = fee_model.preview_inter_round_periods(updater, periods)?;

            let accrued = before.checked_add(after).ok_or(PlatformError::MathOverflow)?;
            (accrued, Some(pending))
        };

        let cumulative = previous
            .cumulative_fee_per_unit
            .checked_add(accrued)
            .ok_or(PlatformError::MathOverflow)?;
        let funding_fees_added = mul_div(accrued, total_units, PRECISION_DECIMALS)?;

        debug!(
            now,
            accrued,
            cumulative,
            funding_fees_added,
            round_id = latest_round.round_id,
            "Snapshot prepared"
        );

        Ok(SnapshotUpdate {
            timestamp: now,
            cumulative_fee_per_unit: cumulative,
            accrued_per_unit: accrued,
            funding_fees_added,
            index_value: latest_round.value,
            round_id: latest_round.round_id,
            is_new: true,
            turbulence,
        })
    }

    /// Record a prepared update; updates for an existing timestamp are no-ops
    pub fn commit(&mut self, update: &SnapshotUpdate) {
        if !update.is_new {
            return;
        }

        self.timestamps.push(update.timestamp);
        self.values.push(update.cumulative_fee_per_unit);
        self.last_round_id = Some(update.round_id);
        self.last_index_value = update.index_value;
    }

    /// Timestamps strictly increase and values never decrease
    #[cfg(debug_assertions)]
    pub fn debug_check_invariants(&self) {
        assert_eq!(self.timestamps.len(), self.values.len());
        assert!(self.timestamps.windows(2).all(|w| w[0] < w[1]));
        assert!(self.values.windows(2).all(|w| w[0] <= w[1]));
        if let Some(first) = self.values.first() {
            assert_eq!(*first, PRECISION_DECIMALS);
        }
    }
}

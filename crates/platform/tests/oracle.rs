mod harness;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::ManualClock;
use index_oracle::{ClampedIndexOracle, IndexOracle, IndexRound, InMemoryIndexFeed, OracleError, RoundId};
use mockall::mock;
use platform::{Collaborators, CollateralTransfer, ErrorKind, InMemoryCollateralLedger, Platform, PlatformError};

use crate::harness::{account, Harness, MAX_INDEX, START};

mock! {
    pub Oracle {}

    impl IndexOracle for Oracle {
        fn latest_round(&self) -> index_oracle::Result<IndexRound>;
        fn round(&self, round_id: RoundId) -> index_oracle::Result<IndexRound>;
        fn max_index_value(&self) -> u64;
    }
}

fn platform_with(oracle: Arc<dyn IndexOracle>, ledger: &InMemoryCollateralLedger) -> Platform {
    platform_at(oracle, ledger, &ManualClock::new(START))
}

fn platform_at(oracle: Arc<dyn IndexOracle>, ledger: &InMemoryCollateralLedger, clock: &ManualClock) -> Platform {
    Platform::from_config(
        &config::generate_default_config(),
        Collaborators {
            oracle,
            transfer: Arc::new(ledger.clone()),
            clock: Arc::new(clock.clone()),
            pool_account: account("pool"),
        },
    )
    .unwrap()
}

#[test]
fn test_fast_rounds_raise_turbulence_and_slow_round_halves_it() {
    let mut h = Harness::new();
    h.platform.refresh().unwrap();

    for expected in [100, 200, 300] {
        h.advance(1_800);
        h.publish(5_000);
        h.platform.refresh().unwrap();
        assert_eq!(h.platform.turbulence_indicator(), expected);
    }

    // turbulence is charged on top of the ratio premium
    let lp = h.fund("lp", 10_000_000_000);
    let trader = h.fund("trader", 1_000_000);
    h.platform.deposit(&lp, 10_000_000_000).unwrap();
    let open = h.platform.open_position(&trader, 1_000_000, MAX_INDEX, 1).unwrap();
    assert_eq!(open.premium_percent, 300);
    assert_eq!(open.premium_fee, 30_000);

    h.advance(7_200);
    h.publish(5_000);
    h.platform.refresh().unwrap();
    assert_eq!(h.platform.turbulence_indicator(), 150);
}

#[test]
fn test_refresh_without_new_round_keeps_turbulence() {
    let mut h = Harness::new();
    h.platform.refresh().unwrap();
    h.advance(1_800);
    h.publish(5_000);
    h.platform.refresh().unwrap();

    h.advance(60);
    h.platform.refresh().unwrap();
    assert_eq!(h.platform.turbulence_indicator(), 100);
}

#[test]
fn test_oracle_failure_is_reported_and_changes_nothing() {
    let mut oracle = MockOracle::new();
    oracle.expect_max_index_value().return_const(MAX_INDEX);
    oracle.expect_latest_round().returning(|| Err(OracleError::NoRounds));

    let ledger = InMemoryCollateralLedger::new();
    let alice = account("alice");
    ledger.mint(&alice, 1_000).unwrap();
    let mut platform = platform_with(Arc::new(oracle), &ledger);

    let err = platform.deposit(&alice, 1_000).unwrap_err();
    assert_eq!(err, PlatformError::Oracle(OracleError::NoRounds));
    assert_eq!(err.kind(), ErrorKind::Oracle);
    assert!(platform.events().is_empty());
    assert!(platform.latest_snapshot().is_none());
    assert_eq!(ledger.balance_of(&alice), 1_000);
}

#[test]
fn test_stale_round_rejected() {
    let mut oracle = MockOracle::new();
    oracle.expect_max_index_value().return_const(MAX_INDEX);
    let mut calls = 0;
    oracle.expect_latest_round().returning(move || {
        calls += 1;
        Ok(IndexRound {
            round_id: if calls == 1 { 2 } else { 1 },
            value: 5_000,
            timestamp: START,
        })
    });

    let ledger = InMemoryCollateralLedger::new();
    let alice = account("alice");
    ledger.mint(&alice, 2_000).unwrap();
    let mut platform = platform_with(Arc::new(oracle), &ledger);

    platform.deposit(&alice, 1_000).unwrap();
    assert_matches!(
        platform.deposit(&alice, 1_000),
        Err(PlatformError::Oracle(OracleError::StaleRound { latest: 1, recorded: 2 }))
    );
    assert_eq!(platform.lp_supply(), 1_000);
}

#[test]
fn test_sanity_feed_deviation_blocks_operations() {
    let primary = InMemoryIndexFeed::new();
    let sanity = InMemoryIndexFeed::new();
    primary.publish(5_000, START).unwrap();
    sanity.publish(6_000, START).unwrap();

    let oracle = ClampedIndexOracle::new(Arc::new(primary.clone()), MAX_INDEX)
        .with_sanity_feed(Arc::new(sanity.clone()), 500);
    let ledger = InMemoryCollateralLedger::new();
    let alice = account("alice");
    ledger.mint(&alice, 1_000).unwrap();
    let mut platform = platform_with(Arc::new(oracle), &ledger);

    assert_matches!(
        platform.deposit(&alice, 1_000),
        Err(PlatformError::Oracle(OracleError::DeviationTooLarge { .. }))
    );

    sanity.publish(5_100, START + 60).unwrap();
    assert_eq!(platform.deposit(&alice, 1_000).unwrap(), 1_000);
}

#[test]
fn test_sparse_round_id_jump_saturates_turbulence() {
    const JUMPED: RoundId = 1 << 62;

    let mut oracle = MockOracle::new();
    oracle.expect_max_index_value().return_const(MAX_INDEX);
    let mut calls = 0;
    oracle.expect_latest_round().returning(move || {
        calls += 1;
        Ok(if calls == 1 {
            IndexRound { round_id: 1, value: 5_000, timestamp: START }
        } else {
            IndexRound { round_id: JUMPED, value: 5_000, timestamp: START + 60 }
        })
    });
    oracle.expect_round().returning(|round_id| {
        Ok(IndexRound { round_id, value: 5_000, timestamp: START })
    });

    let ledger = InMemoryCollateralLedger::new();
    let alice = account("alice");
    ledger.mint(&alice, 2_000).unwrap();
    let clock = ManualClock::new(START);
    let mut platform = platform_at(Arc::new(oracle), &ledger, &clock);

    platform.deposit(&alice, 1_000).unwrap();
    clock.advance(60);
    platform.deposit(&alice, 1_000).unwrap();

    assert_eq!(platform.turbulence_indicator(), 1_000);
    assert_eq!(platform.latest_snapshot().unwrap().timestamp, START + 60);
    assert_eq!(platform.lp_supply(), 2_000);
}

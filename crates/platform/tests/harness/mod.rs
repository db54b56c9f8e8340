#![allow(dead_code)]

use std::sync::Arc;

use common::{Account, Clock, ManualClock, Timestamp};
use config::MasterConfig;
use index_oracle::{ClampedIndexOracle, InMemoryIndexFeed};
use platform::{Collaborators, CollateralTransfer, InMemoryCollateralLedger, Platform};

pub const START: Timestamp = 1_700_000_000;
pub const MAX_INDEX: u64 = 20_000;
pub const DAY: u64 = 86_400;

pub fn account(name: &str) -> Account {
    Account::new(name).unwrap()
}

/// Platform wired to in-memory collaborators the test can drive
pub struct Harness {
    pub platform: Platform,
    pub feed: InMemoryIndexFeed,
    pub clock: ManualClock,
    pub ledger: InMemoryCollateralLedger,
}

impl Harness {
    /// Default configuration with the index at 5000
    pub fn new() -> Self {
        Self::with_config(config::generate_default_config())
    }

    pub fn with_config(config: MasterConfig) -> Self {
        let feed = InMemoryIndexFeed::new();
        feed.publish(5_000, START).unwrap();
        let clock = ManualClock::new(START);
        let ledger = InMemoryCollateralLedger::new();

        let platform = Platform::from_config(
            &config,
            Collaborators {
                oracle: Arc::new(ClampedIndexOracle::new(Arc::new(feed.clone()), MAX_INDEX)),
                transfer: Arc::new(ledger.clone()),
                clock: Arc::new(clock.clone()),
                pool_account: account("pool"),
            },
        )
        .unwrap();

        Self {
            platform,
            feed,
            clock,
            ledger,
        }
    }

    pub fn fund(&self, name: &str, amount: u128) -> Account {
        let holder = account(name);
        self.ledger.mint(&holder, amount).unwrap();
        holder
    }

    pub fn advance(&self, seconds: u64) {
        self.clock.advance(seconds);
    }

    /// Publish a round stamped with the current time
    pub fn publish(&self, index: i64) {
        self.feed.publish(index, self.clock.now()).unwrap();
    }

    pub fn balance_of(&self, name: &str) -> u128 {
        self.ledger.balance_of(&account(name))
    }

    /// The pool account holds exactly the pooled collateral not fronted as margin
    pub fn assert_cash_identity(&self) {
        let state = self.platform.pool_state();
        assert!(state.pooled_collateral >= state.total_margin_debt);
        assert_eq!(self.balance_of("pool"), state.cash(), "cash identity broken: {:?}", state);
    }
}

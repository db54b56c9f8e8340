//! Scenario replay for `volx simulate`
//!
//! A scenario is a YAML list of steps run against in-memory collaborators:
//! a manual clock, an index feed the scenario publishes to, and a collateral
//! ledger funded by `fund` steps. Failed steps are recorded and the replay
//! continues.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use common::{Account, Clock, ManualClock, SystemClock, Timestamp};
use config::MasterConfig;
use index_oracle::{ClampedIndexOracle, IndexFeed, InMemoryIndexFeed};
use platform::{
    CloseResult, Collaborators, CollateralTransfer, InMemoryCollateralLedger, LiquidationOutcome, OpenResult, Platform,
    PlatformError, PlatformEvent, PlatformHandle, PoolState, Position, Snapshot, WithdrawResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Defaults to the current system time
    #[serde(default)]
    pub start_timestamp: Option<Timestamp>,
    pub initial_index: i64,
    #[serde(default = "default_pool_account")]
    pub pool_account: String,
    pub steps: Vec<Step>,
}

fn default_pool_account() -> String {
    "pool".to_string()
}

fn default_leverage() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Fund {
        account: String,
        amount: u128,
    },
    PublishIndex {
        value: i64,
    },
    /// Ignored unless the oracle has a deviation limit configured
    PublishSanityIndex {
        value: i64,
    },
    AdvanceTime {
        seconds: u64,
    },
    Refresh,
    Deposit {
        account: String,
        amount: u128,
    },
    Withdraw {
        account: String,
        amount: u128,
        #[serde(default)]
        max_lp_burn: Option<u128>,
    },
    WithdrawLp {
        account: String,
        lp_amount: u128,
    },
    Open {
        account: String,
        collateral: u128,
        #[serde(default = "default_leverage")]
        leverage: u8,
        #[serde(default)]
        max_index: Option<u64>,
    },
    /// Closes the whole position when `units` is omitted
    Close {
        account: String,
        #[serde(default)]
        units: Option<u128>,
        #[serde(default)]
        min_index: Option<u64>,
    },
    /// Liquidates every candidate when `accounts` is omitted
    Liquidate {
        caller: String,
        #[serde(default)]
        accounts: Option<Vec<String>>,
    },
    SetMaxLeverage {
        value: u8,
    },
    SetLpLockup {
        seconds: u64,
    },
    SetEmergencyWithdraw {
        allowed: bool,
    },
    SetLockExempt {
        account: String,
        exempt: bool,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::PublishIndex { .. } => "publish_index",
            Step::PublishSanityIndex { .. } => "publish_sanity_index",
            Step::AdvanceTime { .. } => "advance_time",
            Step::Refresh => "refresh",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawLp { .. } => "withdraw_lp",
            Step::Open { .. } => "open",
            Step::Close { .. } => "close",
            Step::Liquidate { .. } => "liquidate",
            Step::SetMaxLeverage { .. } => "set_max_leverage",
            Step::SetLpLockup { .. } => "set_lp_lockup",
            Step::SetEmergencyWithdraw { .. } => "set_emergency_withdraw",
            Step::SetLockExempt { .. } => "set_lock_exempt",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StepDetail {
    LpMinted { lp_minted: u128 },
    Round { round_id: u64 },
    Withdraw(WithdrawResult),
    Open(OpenResult),
    Close(CloseResult),
    Liquidation(LiquidationOutcome),
    Snapshot(Snapshot),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok {
        step: usize,
        action: &'static str,
        timestamp: Timestamp,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<StepDetail>,
    },
    Failed {
        step: usize,
        action: &'static str,
        timestamp: Timestamp,
        kind: &'static str,
        error: String,
    },
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok { .. })
    }
}

/// Final state printed by `volx simulate`
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub platform: String,
    pub final_timestamp: Timestamp,
    pub turbulence_percent: u32,
    pub pool: PoolState,
    pub pool_balance: u128,
    pub lp_balances: BTreeMap<String, u128>,
    pub positions: BTreeMap<String, Position>,
    pub collateral: BTreeMap<String, u128>,
    pub steps: Vec<StepOutcome>,
    pub events: Vec<PlatformEvent>,
}

pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read scenario file: {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse scenario file: {:?}", path))
}

fn account(name: &str) -> Result<Account> {
    Account::new(name).with_context(|| format!("Invalid account name: {:?}", name))
}

pub struct Simulation {
    handle: PlatformHandle,
    feed: InMemoryIndexFeed,
    sanity: Option<InMemoryIndexFeed>,
    clock: ManualClock,
    ledger: InMemoryCollateralLedger,
    owner: Account,
    pool_account: Account,
    accounts: BTreeSet<Account>,
}

impl Simulation {
    pub fn new(config: &MasterConfig, scenario: &Scenario) -> Result<Self> {
        let start = scenario.start_timestamp.unwrap_or_else(|| SystemClock.now());
        let clock = ManualClock::new(start);

        let feed = InMemoryIndexFeed::new();
        feed.publish(scenario.initial_index, start)?;
        let sanity = match config.oracle.max_deviation_percent {
            Some(_) => {
                let sanity = InMemoryIndexFeed::new();
                sanity.publish(scenario.initial_index, start)?;
                Some(sanity)
            }
            None => None,
        };

        let oracle = ClampedIndexOracle::from_config(
            Arc::new(feed.clone()),
            sanity.clone().map(|s| Arc::new(s) as Arc<dyn IndexFeed>),
            &config.oracle,
        );
        let ledger = InMemoryCollateralLedger::new();
        let pool_account = account(&scenario.pool_account)?;

        let platform = Platform::from_config(
            config,
            Collaborators {
                oracle: Arc::new(oracle),
                transfer: Arc::new(ledger.clone()),
                clock: Arc::new(clock.clone()),
                pool_account: pool_account.clone(),
            },
        )?;

        Ok(Self {
            owner: platform.owner().clone(),
            handle: PlatformHandle::new(platform),
            feed,
            sanity,
            clock,
            ledger,
            pool_account,
            accounts: BTreeSet::new(),
        })
    }

    #[instrument(skip_all, fields(steps = steps.len()))]
    pub async fn run(mut self, steps: &[Step]) -> Result<SimulationReport> {
        let mut outcomes = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let step_number = index + 1;
            let timestamp = self.clock.now();
            let outcome = match self.apply(step).await {
                Ok(detail) => StepOutcome::Ok {
                    step: step_number,
                    action: step.action(),
                    timestamp,
                    detail,
                },
                Err(err) => {
                    let kind = err
                        .downcast_ref::<PlatformError>()
                        .map_or("scenario", |e| e.kind().as_str());
                    warn!(step = step_number, action = step.action(), kind, error = %err, "Step failed");
                    StepOutcome::Failed {
                        step: step_number,
                        action: step.action(),
                        timestamp,
                        kind,
                        error: format!("{:#}", err),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(steps = outcomes.len(), failed, "Scenario finished");

        self.report(outcomes).await
    }

    async fn apply(&mut self, step: &Step) -> Result<Option<StepDetail>> {
        debug!(action = step.action(), "Applying step");

        let detail = match step {
            Step::Fund { account: name, amount } => {
                let holder = account(name)?;
                self.ledger.mint(&holder, *amount)?;
                self.accounts.insert(holder);
                None
            }
            Step::PublishIndex { value } => {
                let round_id = self.feed.publish(*value, self.clock.now())?;
                Some(StepDetail::Round { round_id })
            }
            Step::PublishSanityIndex { value } => match &self.sanity {
                Some(sanity) => {
                    let round_id = sanity.publish(*value, self.clock.now())?;
                    Some(StepDetail::Round { round_id })
                }
                None => None,
            },
            Step::AdvanceTime { seconds } => {
                self.clock.advance(*seconds);
                None
            }
            Step::Refresh => Some(StepDetail::Snapshot(self.handle.refresh().await?)),
            Step::Deposit { account: name, amount } => {
                let lp_minted = self.handle.deposit(&account(name)?, *amount).await?;
                Some(StepDetail::LpMinted { lp_minted })
            }
            Step::Withdraw {
                account: name,
                amount,
                max_lp_burn,
            } => {
                let result = self
                    .handle
                    .withdraw(&account(name)?, *amount, max_lp_burn.unwrap_or(u128::MAX))
                    .await?;
                Some(StepDetail::Withdraw(result))
            }
            Step::WithdrawLp { account: name, lp_amount } => {
                let result = self.handle.withdraw_lp_tokens(&account(name)?, *lp_amount).await?;
                Some(StepDetail::Withdraw(result))
            }
            Step::Open {
                account: name,
                collateral,
                leverage,
                max_index,
            } => {
                let max_index = match max_index {
                    Some(bound) => *bound,
                    None => self.handle.read(|p| p.max_index_value()).await,
                };
                let result = self
                    .handle
                    .open_position(&account(name)?, *collateral, max_index, *leverage)
                    .await?;
                Some(StepDetail::Open(result))
            }
            Step::Close {
                account: name,
                units,
                min_index,
            } => {
                let holder = account(name)?;
                let units = match units {
                    Some(units) => *units,
                    None => self
                        .handle
                        .read(|p| p.position(&holder).map_or(0, |position| position.position_units))
                        .await,
                };
                let result = self
                    .handle
                    .close_position(&holder, units, min_index.unwrap_or(1))
                    .await?;
                Some(StepDetail::Close(result))
            }
            Step::Liquidate { caller, accounts } => {
                let caller = account(caller)?;
                let targets = match accounts {
                    Some(names) => names.iter().map(|n| account(n)).collect::<Result<Vec<_>>>()?,
                    None => self.handle.get_liquidable_addresses().await?,
                };
                let outcome = self.handle.liquidate_positions(&caller, &targets).await?;
                self.accounts.insert(caller);
                Some(StepDetail::Liquidation(outcome))
            }
            Step::SetMaxLeverage { value } => {
                let owner = self.owner.clone();
                self.handle.write(|p| p.set_max_leverage(&owner, *value)).await?;
                None
            }
            Step::SetLpLockup { seconds } => {
                let owner = self.owner.clone();
                self.handle.write(|p| p.set_lp_lockup(&owner, *seconds)).await?;
                None
            }
            Step::SetEmergencyWithdraw { allowed } => {
                let owner = self.owner.clone();
                self.handle
                    .write(|p| p.set_emergency_withdraw_allowed(&owner, *allowed))
                    .await?;
                None
            }
            Step::SetLockExempt { account: name, exempt } => {
                let owner = self.owner.clone();
                let target = account(name)?;
                self.handle
                    .write(|p| p.set_lock_exempt(&owner, &target, *exempt))
                    .await?;
                None
            }
        };

        Ok(detail)
    }

    async fn report(self, steps: Vec<StepOutcome>) -> Result<SimulationReport> {
        let pool_balance = self.handle.pool_balance().await?;

        let mut collateral: BTreeMap<String, u128> = self
            .accounts
            .iter()
            .map(|a| (a.to_string(), self.ledger.balance_of(a)))
            .collect();
        collateral.insert(self.pool_account.to_string(), self.ledger.balance_of(&self.pool_account));

        let final_timestamp = self.clock.now();
        Ok(self
            .handle
            .read(|p| SimulationReport {
                platform: p.name().to_string(),
                final_timestamp,
                turbulence_percent: p.turbulence_indicator(),
                pool: p.pool_state(),
                pool_balance,
                lp_balances: p.lp_holders().map(|(a, lp)| (a.to_string(), *lp)).collect(),
                positions: p.positions().map(|(a, pos)| (a.to_string(), *pos)).collect(),
                collateral,
                steps,
                events: p.events().events().to_vec(),
            })
            .await)
    }
}

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of the YAML configuration file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub platform: PlatformConfig,
    pub oracle: OracleConfig,
    pub fees: FeesConfig,
    pub liquidation: LiquidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ==================================================================================
// PLATFORM CONFIG
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub name: String,
    /// Account allowed to change parameters at runtime
    pub owner: String,
    /// LP tokens minted per collateral token while the pool is empty
    #[serde(rename = "initial_lp_rate")]
    #[serde(default = "default_initial_lp_rate")]
    pub initial_lp_rate: u128,
    #[serde(rename = "max_leverage")]
    #[serde(default = "default_max_leverage")]
    pub max_leverage: u8,
    #[serde(rename = "lp_lockup_seconds")]
    #[serde(default = "default_lp_lockup_seconds")]
    pub lp_lockup_seconds: u64,
    #[serde(rename = "emergency_withdraw_allowed")]
    #[serde(default)]
    pub emergency_withdraw_allowed: bool,
    /// Accounts that always pay the base close fee
    #[serde(rename = "lock_exempt_accounts")]
    #[serde(default)]
    pub lock_exempt_accounts: Vec<String>,
}

// ==================================================================================
// ORACLE CONFIG
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    #[serde(rename = "max_index_value")]
    #[serde(default = "default_max_index_value")]
    pub max_index_value: u64,
    /// Maximum primary/sanity deviation, in hundredths of a percent
    #[serde(rename = "max_deviation_percent")]
    #[serde(default)]
    pub max_deviation_percent: Option<u32>,
}

// ==================================================================================
// FEES CONFIG
// ==================================================================================

/// All percentages are in hundredths of a percent (10000 == 100%)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeesConfig {
    #[serde(rename = "deposit_fee_percent")]
    #[serde(default)]
    pub deposit_fee_percent: u32,
    #[serde(rename = "withdraw_fee_percent")]
    #[serde(default)]
    pub withdraw_fee_percent: u32,
    #[serde(rename = "open_fee_percent")]
    #[serde(default = "default_open_fee_percent")]
    pub open_fee_percent: u32,
    pub close: CloseFeeConfig,
    pub premium: PremiumFeeConfig,
    pub turbulence: TurbulenceConfig,
    #[serde(default)]
    pub funding: FundingFeeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloseFeeConfig {
    #[serde(rename = "fee_percent")]
    #[serde(default = "default_close_fee_percent")]
    pub fee_percent: u32,
    /// Fee charged when closing immediately after opening
    #[serde(rename = "max_fee_percent")]
    #[serde(default = "default_close_max_fee_percent")]
    pub max_fee_percent: u32,
    #[serde(rename = "decay_period_seconds")]
    #[serde(default = "default_close_decay_period_seconds")]
    pub decay_period_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PremiumFeeConfig {
    #[serde(rename = "max_percent")]
    #[serde(default = "default_premium_max_percent")]
    pub max_percent: u32,
    /// Collateral ratio below which no premium is charged
    #[serde(rename = "min_collateral_ratio_percent")]
    #[serde(default = "default_premium_min_collateral_ratio_percent")]
    pub min_collateral_ratio_percent: u32,
    #[serde(default = "default_premium_coefficient")]
    pub coefficient: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurbulenceConfig {
    #[serde(rename = "step_percent")]
    #[serde(default = "default_turbulence_step_percent")]
    pub step_percent: u32,
    #[serde(rename = "max_percent")]
    #[serde(default = "default_turbulence_max_percent")]
    pub max_percent: u32,
    /// Indicator values below this are treated as zero; defaults to the step
    #[serde(rename = "noise_floor_percent")]
    #[serde(default)]
    pub noise_floor_percent: Option<u32>,
    /// Round intervals at or above this halve the indicator
    #[serde(rename = "heartbeat_seconds")]
    #[serde(default = "default_turbulence_heartbeat_seconds")]
    pub heartbeat_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FundingFeeConfig {
    #[serde(rename = "min_rate")]
    #[serde(default = "default_funding_min_rate")]
    pub min_rate: u64,
    #[serde(rename = "max_rate")]
    #[serde(default = "default_funding_max_rate")]
    pub max_rate: u64,
}

impl Default for FundingFeeConfig {
    fn default() -> Self {
        Self {
            min_rate: default_funding_min_rate(),
            max_rate: default_funding_max_rate(),
        }
    }
}

// ==================================================================================
// LIQUIDATION CONFIG
// ==================================================================================

/// Percentages are in tenths of a percent (1000 == 100%), indexed by leverage - 1
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiquidationConfig {
    #[serde(rename = "min_reward_percent")]
    #[serde(default = "default_liquidation_min_reward_percent")]
    pub min_reward_percent: u32,
    #[serde(rename = "threshold_percents")]
    #[serde(default = "default_liquidation_threshold_percents")]
    pub threshold_percents: [u32; 8],
    #[serde(rename = "max_reward_percents")]
    #[serde(default = "default_liquidation_max_reward_percents")]
    pub max_reward_percents: [u32; 8],
}

// ==================================================================================
// LOGGING CONFIG
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_master_config() {
        let yaml = include_str!("../../../master_config/volx.yaml");

        let config: MasterConfig = serde_yaml::from_str(yaml).expect("sample config parses");

        assert_eq!(config.platform.name, "Volx Volatility Pool");
        assert_eq!(config.platform.max_leverage, 8);
        assert_eq!(config.oracle.max_index_value, 20_000);
        assert_eq!(config.fees.open_fee_percent, 15);
        assert_eq!(config.fees.close.max_fee_percent, 300);
        assert_eq!(config.fees.turbulence.heartbeat_seconds, 3600);
        assert_eq!(
            config.liquidation.threshold_percents,
            [50, 50, 100, 100, 150, 150, 200, 200]
        );
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = r#"
platform:
  name: minimal
  owner: admin
oracle: {}
fees:
  close: {}
  premium: {}
  turbulence: {}
liquidation: {}
"#;
        let config: MasterConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.platform.initial_lp_rate, 1);
        assert_eq!(config.platform.lp_lockup_seconds, 259_200);
        assert!(!config.platform.emergency_withdraw_allowed);
        assert_eq!(config.oracle.max_deviation_percent, None);
        assert_eq!(config.fees.deposit_fee_percent, 0);
        assert_eq!(config.fees.premium.min_collateral_ratio_percent, 6500);
        assert_eq!(config.fees.funding.max_rate, 100_000);
        assert_eq!(config.fees.turbulence.noise_floor_percent, None);
        assert_eq!(config.liquidation.max_reward_percents, [30; 8]);
    }
}

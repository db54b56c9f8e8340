use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse configuration text after environment variable substitution
pub fn parse_config(content: &str) -> Result<MasterConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: MasterConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> MasterConfig {
    use defaults::*;

    MasterConfig {
        platform: PlatformConfig {
            name: "Volx Volatility Pool".to_string(),
            owner: "admin".to_string(),
            initial_lp_rate: default_initial_lp_rate(),
            max_leverage: default_max_leverage(),
            lp_lockup_seconds: default_lp_lockup_seconds(),
            emergency_withdraw_allowed: false,
            lock_exempt_accounts: vec![],
        },
        oracle: OracleConfig {
            max_index_value: default_max_index_value(),
            max_deviation_percent: None,
        },
        fees: FeesConfig {
            deposit_fee_percent: 0,
            withdraw_fee_percent: 0,
            open_fee_percent: default_open_fee_percent(),
            close: CloseFeeConfig {
                fee_percent: default_close_fee_percent(),
                max_fee_percent: default_close_max_fee_percent(),
                decay_period_seconds: default_close_decay_period_seconds(),
            },
            premium: PremiumFeeConfig {
                max_percent: default_premium_max_percent(),
                min_collateral_ratio_percent: default_premium_min_collateral_ratio_percent(),
                coefficient: default_premium_coefficient(),
            },
            turbulence: TurbulenceConfig {
                step_percent: default_turbulence_step_percent(),
                max_percent: default_turbulence_max_percent(),
                noise_floor_percent: None,
                heartbeat_seconds: default_turbulence_heartbeat_seconds(),
            },
            funding: FundingFeeConfig::default(),
        },
        liquidation: LiquidationConfig {
            min_reward_percent: default_liquidation_min_reward_percent(),
            threshold_percents: default_liquidation_threshold_percents(),
            max_reward_percents: default_liquidation_max_reward_percents(),
        },
        logging: LoggingConfig::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

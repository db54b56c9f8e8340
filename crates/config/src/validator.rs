use crate::*;
use thiserror::Error;

/// Scale for fee-style percentages (10000 == 100%)
pub const FEE_PERCENT_SCALE: u32 = 10_000;
/// Scale for liquidation percentages (1000 == 100%)
pub const LIQUIDATION_PERCENT_SCALE: u32 = 1_000;
/// Scale for funding rates (1_000_000 == 100% per day)
pub const FUNDING_RATE_SCALE: u64 = 1_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Platform name is required")]
    MissingPlatformName,

    #[error("Platform owner is required")]
    MissingOwner,

    #[error("max_leverage must be between 1 and 8, got: {0}")]
    InvalidMaxLeverage(u8),

    #[error("initial_lp_rate must be a positive integer")]
    InvalidInitialLpRate,

    #[error("lock_exempt_accounts contains a blank account")]
    BlankLockExemptAccount,

    #[error("max_index_value must be a positive integer")]
    InvalidMaxIndexValue,

    #[error("{field} must be at most {max}, got: {value}")]
    PercentOutOfRange { field: String, value: u64, max: u64 },

    #[error("fees.close.max_fee_percent ({max}) must be >= fees.close.fee_percent ({base})")]
    CloseFeeOrdering { base: u32, max: u32 },

    #[error("fees.funding.min_rate ({min}) must be <= fees.funding.max_rate ({max})")]
    FundingRateOrdering { min: u64, max: u64 },

    #[error("fees.premium.min_collateral_ratio_percent must be below 10000, got: {0}")]
    InvalidMinCollateralRatio(u32),

    #[error("liquidation.threshold_percents must be non-decreasing (leverage {leverage})")]
    ThresholdsNotMonotonic { leverage: usize },

    #[error("liquidation.max_reward_percents[{index}] ({value}) is below min_reward_percent ({min})")]
    MaxRewardBelowMin { index: usize, value: u32, min: u32 },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_platform(&config.platform, &mut report);
    validate_oracle(&config.oracle, &mut report);
    validate_fees(&config.fees, &mut report);
    validate_liquidation(&config.liquidation, &mut report);
    validate_logging(&config.logging, &mut report);

    report
}

fn check_percent(field: &str, value: u64, max: u64, report: &mut ValidationReport) {
    if value > max {
        report.add_error(ValidationError::PercentOutOfRange {
            field: field.to_string(),
            value,
            max,
        });
    }
}

fn validate_platform(platform: &PlatformConfig, report: &mut ValidationReport) {
    if platform.name.trim().is_empty() {
        report.add_error(ValidationError::MissingPlatformName);
    }

    if platform.owner.trim().is_empty() {
        report.add_error(ValidationError::MissingOwner);
    }

    if !(1..=8).contains(&platform.max_leverage) {
        report.add_error(ValidationError::InvalidMaxLeverage(platform.max_leverage));
    }

    if platform.initial_lp_rate == 0 {
        report.add_error(ValidationError::InvalidInitialLpRate);
    }

    if platform.lock_exempt_accounts.iter().any(|a| a.trim().is_empty()) {
        report.add_error(ValidationError::BlankLockExemptAccount);
    }

    if platform.emergency_withdraw_allowed {
        report.add_warning(
            "platform.emergency_withdraw_allowed",
            "Withdrawals may leave open positions uncollateralized",
        );
    }

    if platform.lp_lockup_seconds == 0 {
        report.add_warning(
            "platform.lp_lockup_seconds",
            "Liquidity providers can withdraw in the same second they deposit",
        );
    }
}

fn validate_oracle(oracle: &OracleConfig, report: &mut ValidationReport) {
    if oracle.max_index_value == 0 {
        report.add_error(ValidationError::InvalidMaxIndexValue);
    }

    match oracle.max_deviation_percent {
        Some(deviation) => check_percent(
            "oracle.max_deviation_percent",
            deviation.into(),
            FEE_PERCENT_SCALE.into(),
            report,
        ),
        None => report.add_warning(
            "oracle.max_deviation_percent",
            "No sanity feed deviation check configured",
        ),
    }
}

fn validate_fees(fees: &FeesConfig, report: &mut ValidationReport) {
    let scale = u64::from(FEE_PERCENT_SCALE);

    check_percent("fees.deposit_fee_percent", fees.deposit_fee_percent.into(), scale, report);
    check_percent("fees.withdraw_fee_percent", fees.withdraw_fee_percent.into(), scale, report);
    check_percent("fees.open_fee_percent", fees.open_fee_percent.into(), scale, report);

    check_percent("fees.close.fee_percent", fees.close.fee_percent.into(), scale, report);
    check_percent("fees.close.max_fee_percent", fees.close.max_fee_percent.into(), scale, report);
    if fees.close.max_fee_percent < fees.close.fee_percent {
        report.add_error(ValidationError::CloseFeeOrdering {
            base: fees.close.fee_percent,
            max: fees.close.max_fee_percent,
        });
    }
    if fees.close.decay_period_seconds == 0 {
        report.add_warning(
            "fees.close.decay_period_seconds",
            "Close fee never decays; every close pays the base fee",
        );
    }

    check_percent("fees.premium.max_percent", fees.premium.max_percent.into(), scale, report);
    if fees.premium.min_collateral_ratio_percent >= FEE_PERCENT_SCALE {
        report.add_error(ValidationError::InvalidMinCollateralRatio(
            fees.premium.min_collateral_ratio_percent,
        ));
    }

    check_percent("fees.turbulence.step_percent", fees.turbulence.step_percent.into(), scale, report);
    check_percent("fees.turbulence.max_percent", fees.turbulence.max_percent.into(), scale, report);
    if let Some(floor) = fees.turbulence.noise_floor_percent {
        if floor > fees.turbulence.max_percent {
            report.add_warning(
                "fees.turbulence.noise_floor_percent",
                "Noise floor above max_percent keeps the indicator at zero",
            );
        }
    }

    check_percent("fees.funding.min_rate", fees.funding.min_rate, FUNDING_RATE_SCALE, report);
    check_percent("fees.funding.max_rate", fees.funding.max_rate, FUNDING_RATE_SCALE, report);
    if fees.funding.min_rate > fees.funding.max_rate {
        report.add_error(ValidationError::FundingRateOrdering {
            min: fees.funding.min_rate,
            max: fees.funding.max_rate,
        });
    }
}

fn validate_liquidation(liquidation: &LiquidationConfig, report: &mut ValidationReport) {
    let scale = u64::from(LIQUIDATION_PERCENT_SCALE);

    check_percent(
        "liquidation.min_reward_percent",
        liquidation.min_reward_percent.into(),
        scale,
        report,
    );

    for (i, threshold) in liquidation.threshold_percents.iter().enumerate() {
        check_percent(
            &format!("liquidation.threshold_percents[{}]", i),
            (*threshold).into(),
            scale,
            report,
        );
    }

    for (i, pair) in liquidation.threshold_percents.windows(2).enumerate() {
        if pair[1] < pair[0] {
            report.add_error(ValidationError::ThresholdsNotMonotonic { leverage: i + 2 });
        }
    }

    for (i, max_reward) in liquidation.max_reward_percents.iter().enumerate() {
        check_percent(
            &format!("liquidation.max_reward_percents[{}]", i),
            (*max_reward).into(),
            scale,
            report,
        );
        if *max_reward < liquidation.min_reward_percent {
            report.add_error(ValidationError::MaxRewardBelowMin {
                index: i,
                value: *max_reward,
                min: liquidation.min_reward_percent,
            });
        }
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if !matches!(logging.format.as_str(), "pretty" | "json" | "compact") {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn test_close_fee_ordering() {
        let mut config = generate_default_config();
        config.fees.close.fee_percent = 400;
        config.fees.close.max_fee_percent = 300;

        let report = validate_config(&config);
        assert!(report
            .errors
            .contains(&ValidationError::CloseFeeOrdering { base: 400, max: 300 }));
    }

    #[test]
    fn test_leverage_bounds() {
        let mut config = generate_default_config();
        config.platform.max_leverage = 0;
        assert!(validate_config(&config)
            .errors
            .contains(&ValidationError::InvalidMaxLeverage(0)));

        config.platform.max_leverage = 9;
        assert!(validate_config(&config)
            .errors
            .contains(&ValidationError::InvalidMaxLeverage(9)));
    }

    #[test]
    fn test_threshold_table_must_be_non_decreasing() {
        let mut config = generate_default_config();
        config.liquidation.threshold_percents = [50, 50, 100, 90, 150, 150, 200, 200];

        let report = validate_config(&config);
        assert!(report
            .errors
            .contains(&ValidationError::ThresholdsNotMonotonic { leverage: 4 }));
    }

    #[test]
    fn test_max_reward_below_min_reward() {
        let mut config = generate_default_config();
        config.liquidation.min_reward_percent = 40;

        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 8);
    }

    #[test]
    fn test_percent_scales() {
        let mut config = generate_default_config();
        config.fees.open_fee_percent = 10_001;
        config.fees.premium.min_collateral_ratio_percent = 10_000;
        config.oracle.max_index_value = 0;
        config.logging.format = "xml".to_string();

        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::PercentOutOfRange {
            field: "fees.open_fee_percent".to_string(),
            value: 10_001,
            max: 10_000,
        }));
        assert!(report
            .errors
            .contains(&ValidationError::InvalidMinCollateralRatio(10_000)));
        assert!(report.errors.contains(&ValidationError::InvalidMaxIndexValue));
        assert!(report
            .errors
            .contains(&ValidationError::InvalidLogFormat("xml".to_string())));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut config = generate_default_config();
        config.platform.emergency_withdraw_allowed = true;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "platform.emergency_withdraw_allowed"));
    }
}

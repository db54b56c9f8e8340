pub fn default_initial_lp_rate() -> u128 {
    1
}

pub fn default_max_leverage() -> u8 {
    8
}

pub fn default_lp_lockup_seconds() -> u64 {
    3 * 24 * 60 * 60
}

pub fn default_max_index_value() -> u64 {
    20_000
}

pub fn default_open_fee_percent() -> u32 {
    15
}

pub fn default_close_fee_percent() -> u32 {
    30
}

pub fn default_close_max_fee_percent() -> u32 {
    300
}

pub fn default_close_decay_period_seconds() -> u64 {
    24 * 60 * 60
}

pub fn default_premium_max_percent() -> u32 {
    1000
}

pub fn default_premium_min_collateral_ratio_percent() -> u32 {
    6500
}

pub fn default_premium_coefficient() -> u32 {
    5
}

pub fn default_turbulence_step_percent() -> u32 {
    100
}

pub fn default_turbulence_max_percent() -> u32 {
    1000
}

pub fn default_turbulence_heartbeat_seconds() -> u64 {
    60 * 60
}

pub fn default_funding_min_rate() -> u64 {
    2_000
}

pub fn default_funding_max_rate() -> u64 {
    100_000
}

pub fn default_liquidation_min_reward_percent() -> u32 {
    5
}

pub fn default_liquidation_threshold_percents() -> [u32; 8] {
    [50, 50, 100, 100, 150, 150, 200, 200]
}

pub fn default_liquidation_max_reward_percents() -> [u32; 8] {
    [30; 8]
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

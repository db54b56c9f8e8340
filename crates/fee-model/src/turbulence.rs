//! Turbulence indicator
//!
//! Frequent index rounds signal a volatile index. Every inter-round period
//! shorter than the heartbeat raises the indicator by one step, every
//! longer one halves it. The result is zeroed below the noise floor and
//! capped at the maximum once the whole batch has been applied.

/// Limits applied to the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurbulenceLimits {
    pub step: u32,
    pub max: u32,
    pub noise_floor: u32,
    pub heartbeat: u64,
}

/// A batch of equal inter-round periods
///
/// Round ids only increase; they are not contiguous, so `count` may be huge.
/// The batch is applied arithmetically and never expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterRoundPeriods {
    pub period: u64,
    pub count: u64,
}

impl InterRoundPeriods {
    /// A single period
    pub fn single(period: u64) -> Self {
        Self { period, count: 1 }
    }

    /// Split the time between two rounds evenly across the rounds published in it
    pub fn split(total_time: u64, new_rounds: u64) -> Self {
        if new_rounds == 0 {
            return Self { period: 0, count: 0 };
        }
        Self {
            period: total_time / new_rounds,
            count: new_rounds,
        }
    }
}

/// Indicator value after applying `periods` to `current`
pub fn turbulence_after(current: u32, periods: InterRoundPeriods, limits: TurbulenceLimits) -> u32 {
    let value = if periods.count == 0 {
        current
    } else if periods.period < limits.heartbeat {
        let raise = u64::from(limits.step).saturating_mul(periods.count);
        u32::try_from(u64::from(current).saturating_add(raise)).unwrap_or(u32::MAX)
    } else if periods.count >= u64::from(u32::BITS) {
        0
    } else {
        current >> periods.count
    };

    if value < limits.noise_floor {
        0
    } else {
        value.min(limits.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: TurbulenceLimits = TurbulenceLimits {
        step: 100,
        max: 1_000,
        noise_floor: 100,
        heartbeat: 3_600,
    };

    #[test]
    fn test_fast_rounds_step_up_then_slow_round_halves() {
        let mut value = 0;
        for _ in 0..3 {
            value = turbulence_after(value, InterRoundPeriods::single(1_800), LIMITS);
        }
        assert_eq!(value, 300);

        assert_eq!(turbulence_after(value, InterRoundPeriods::single(3_600), LIMITS), 150);
    }

    #[test]
    fn test_capped_at_max_after_batch() {
        let fast = InterRoundPeriods { period: 60, count: 15 };
        assert_eq!(turbulence_after(0, fast, LIMITS), 1_000);
        assert_eq!(turbulence_after(1_000, InterRoundPeriods::single(7_200), LIMITS), 500);
    }

    #[test]
    fn test_slow_batch_halves_per_round() {
        let slow = InterRoundPeriods { period: 4_000, count: 2 };
        assert_eq!(turbulence_after(800, slow, LIMITS), 200);
        assert_eq!(turbulence_after(800, InterRoundPeriods { period: 4_000, count: 3 }, LIMITS), 100);
        assert_eq!(turbulence_after(800, InterRoundPeriods { period: 4_000, count: 4 }, LIMITS), 0);
    }

    #[test]
    fn test_noise_floor_zeroes_small_values() {
        assert_eq!(turbulence_after(100, InterRoundPeriods::single(4_000), LIMITS), 0);
        assert_eq!(turbulence_after(300, InterRoundPeriods::single(4_000), LIMITS), 150);
    }

    #[test]
    fn test_sparse_round_ids_do_not_expand() {
        let jump = InterRoundPeriods::split(60, 1 << 62);
        assert_eq!(jump, InterRoundPeriods { period: 0, count: 1 << 62 });
        assert_eq!(turbulence_after(0, jump, LIMITS), 1_000);

        let slow_jump = InterRoundPeriods { period: 7_200, count: u64::MAX };
        assert_eq!(turbulence_after(1_000, slow_jump, LIMITS), 0);

        let saturating = TurbulenceLimits { step: u32::MAX, max: u32::MAX, ..LIMITS };
        assert_eq!(turbulence_after(u32::MAX, jump, saturating), u32::MAX);
    }

    #[test]
    fn test_split_evenly() {
        assert_eq!(
            InterRoundPeriods::split(3_000, 3),
            InterRoundPeriods { period: 1_000, count: 3 }
        );
        assert_eq!(InterRoundPeriods::split(10, 3).period, 3);
        assert_eq!(InterRoundPeriods::split(100, 0).count, 0);
    }
}

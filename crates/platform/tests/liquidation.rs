mod harness;

use assert_matches::assert_matches;
use platform::{PlatformError, PlatformEvent};

use crate::harness::{account, Harness, DAY};

fn funded_pool(lp_amount: u128) -> Harness {
    let mut h = Harness::new();
    let lp = h.fund("lp", lp_amount);
    h.platform.deposit(&lp, lp_amount).unwrap();
    h
}

#[test]
fn test_funding_pushes_position_over_threshold() {
    let mut h = funded_pool(10_000_000_000);
    let trader = h.fund("trader", 1_000_000);
    let keeper = account("keeper");
    let open = h.platform.open_position(&trader, 1_000_000, 20_000, 1).unwrap();

    // eight days at 2.5% a day leave exactly the 5% threshold of 3_994_000 units
    h.advance(8 * DAY);
    let balance = h.platform.calculate_balance(&trader).unwrap();
    assert_eq!(balance.funding_fees, 798_800);
    assert_eq!(balance.balance, 199_700);
    assert!(h.platform.get_liquidable_addresses().unwrap().is_empty());
    assert_matches!(
        h.platform.liquidate_positions(&keeper, &[trader.clone()]),
        Err(PlatformError::NoLiquidablePosition)
    );

    h.advance(1);
    assert_eq!(h.platform.calculate_balance(&trader).unwrap().balance, 199_699);
    assert_eq!(h.platform.get_liquidable_addresses().unwrap(), vec![trader.clone()]);
    // above the 3% cap of the 998_500 notional
    assert_eq!(h.platform.liquidation_reward_preview(&trader).unwrap(), 29_955);

    let outcome = h.platform.liquidate_positions(&keeper, &[trader.clone()]).unwrap();
    assert_eq!(outcome.liquidated, vec![trader.clone()]);
    assert_eq!(outcome.reward, 29_955);
    assert_eq!(h.balance_of("keeper"), 29_955);

    assert!(h.platform.position(&trader).is_none());
    assert_eq!(h.platform.total_position_units_amount(), 0);
    assert_eq!(h.platform.total_funding_fees_amount(), 0);
    h.assert_cash_identity();

    let events = h.platform.events().events();
    assert_matches!(
        &events[events.len() - 2],
        PlatformEvent::LiquidatePosition { account, balance: 199_699, is_positive: true, position_units, .. }
            if *account == trader && *position_units == open.position_units
    );
    assert_matches!(
        &events[events.len() - 1],
        PlatformEvent::LiquidationReward { amount: 29_955, positions: 1, .. }
    );
}

#[test]
fn test_negative_balance_pays_minimum_reward() {
    let mut h = funded_pool(1_000_000_000);
    let trader = h.fund("trader", 1_000_000);
    let keeper = account("keeper");
    let open = h.platform.open_position(&trader, 1_000_000, 20_000, 8).unwrap();
    assert_eq!(open.position_units, 31_616_000);
    assert_eq!(h.platform.total_margin_debt(), 6_916_000);

    h.advance(1);
    h.publish(4_000);
    let balance = h.platform.calculate_balance(&trader).unwrap();
    assert!(!balance.is_positive);
    assert_eq!(balance.balance, 592_809);

    // floor is 0.5% of the 7_904_000 notional at open
    assert_eq!(h.platform.liquidation_reward_preview(&trader).unwrap(), 39_520);
    let outcome = h.platform.liquidate_positions(&keeper, &[trader.clone()]).unwrap();
    assert_eq!(outcome.reward, 39_520);
    assert_eq!(h.platform.total_margin_debt(), 0);
    h.assert_cash_identity();
}

#[test]
fn test_reward_between_floor_and_cap_is_balance() {
    let mut h = funded_pool(10_000_000_000);
    let trader = h.fund("trader", 1_000_000);
    h.platform.open_position(&trader, 1_000_000, 20_000, 1).unwrap();

    h.advance(1);
    h.publish(100);
    let balance = h.platform.calculate_balance(&trader).unwrap();
    assert!(balance.is_positive);
    assert_eq!(balance.balance, 19_969);
    assert_eq!(h.platform.liquidation_reward_preview(&trader).unwrap(), 19_969);

    let outcome = h.platform.liquidate_positions(&account("keeper"), &[trader]).unwrap();
    assert_eq!(outcome.reward, 19_969);
    h.assert_cash_identity();
}

#[test]
fn test_batch_skips_healthy_unknown_and_duplicate_accounts() {
    let mut h = funded_pool(10_000_000_000);
    let healthy = h.fund("healthy", 1_000_000);
    let risky = h.fund("risky", 1_000_000);
    h.platform.open_position(&healthy, 1_000_000, 20_000, 1).unwrap();
    h.platform.open_position(&risky, 1_000_000, 20_000, 8).unwrap();

    h.advance(1);
    h.publish(4_000);
    let outcome = h
        .platform
        .liquidate_positions(
            &account("keeper"),
            &[healthy.clone(), risky.clone(), account("nobody"), risky.clone()],
        )
        .unwrap();

    assert_eq!(outcome.liquidated, vec![risky.clone()]);
    assert!(h.platform.position(&healthy).is_some());
    assert!(h.platform.position(&risky).is_none());
    assert_eq!(
        h.platform.total_position_units_amount(),
        h.platform.position(&healthy).unwrap().position_units
    );
    h.assert_cash_identity();
}

#[test]
fn test_liquidation_reward_preview_requires_position() {
    let h = funded_pool(1_000);
    assert_matches!(
        h.platform.liquidation_reward_preview(&account("ghost")),
        Err(PlatformError::NoPosition(_))
    );
}

//! Vault scenarios with exact fixed-point expectations.
//!
//! Every number here follows from the default fees: 10 bps margin, 30 bps swap
//! and mint/burn, a 5 USD liquidation fee and 50x max leverage.

mod common;

use common::*;
use perps_vault::*;
use primitive_types::U256;
use rust_decimal_macros::dec;

// ---- liquidity ----

#[test]
fn buy_usdg_mints_after_fee_value() {
    let mut vault = vault_with(3);
    push_btc(&mut vault, &[40000, 41000, 40000]);
    deposit(&mut vault, BOB, BTC, sat(250_000));

    let minted = vault.buy_usdg(BTC, BOB).unwrap();

    // 249250 sat at the 40000 min price
    assert_eq!(minted, expand_decimals(997, 17));
    assert_eq!(vault.balance_of(BOB, SHARE), minted);
    assert_eq!(vault.total_supply(SHARE), minted);
    assert_eq!(vault.fee_reserves(BTC), sat(750));
    assert_eq!(vault.pool_amount(BTC), sat(249_250));
    assert_eq!(vault.usdg_amount(BTC), minted);
}

#[test]
fn buy_usdg_without_deposit_fails() {
    let mut vault = vault_with(3);
    push_btc(&mut vault, &[40000]);
    assert_eq!(vault.buy_usdg(BTC, BOB), Err(VaultError::InvalidAmountIn));
}

#[test]
fn sell_usdg_redeems_at_max_price() {
    let mut vault = vault_with(1);
    deposit(&mut vault, BOB, DAI, dai(100_000));
    let shares = vault.buy_usdg(DAI, BOB).unwrap();
    assert_eq!(vault.pool_amount(DAI), dai(99_700));

    let half = shares / 2;
    vault.transfer_tokens(BOB, SHARE, VAULT, half).unwrap();
    let out = vault.sell_usdg(DAI, BOB).unwrap();

    assert_eq!(out, expand_decimals(4_970_045, 16));
    assert_eq!(vault.balance_of(BOB, DAI), out);
    assert_eq!(vault.pool_amount(DAI), dai(49_850));
    assert_eq!(vault.total_supply(SHARE), shares - half);
    assert_eq!(vault.fee_reserves(DAI), dai(300) + expand_decimals(14_955, 16));
}

#[test]
fn sell_usdg_respects_redemption_cap() {
    let mut vault = vault_with(1);
    deposit(&mut vault, BOB, DAI, dai(100_000));
    let shares = vault.buy_usdg(DAI, BOB).unwrap();

    let capped = AssetConfig { redemption_bps: 1_000, ..AssetConfig::stable(18) };
    vault.set_asset_config(GOV, DAI, capped).unwrap();

    vault.transfer_tokens(BOB, SHARE, VAULT, shares / 2).unwrap();
    let pool_before = vault.pool(DAI).cloned();
    let result = vault.sell_usdg(DAI, BOB);

    assert!(matches!(result, Err(VaultError::RedemptionCapExceeded { .. })));
    assert_eq!(vault.pool(DAI).cloned(), pool_before);
    assert_eq!(vault.total_supply(SHARE), shares);
}

#[test]
fn direct_pool_deposit_mints_nothing() {
    let mut vault = btc_pool();
    let supply = vault.total_supply(SHARE);
    deposit(&mut vault, ALICE, BTC, sat(1_000));

    assert_eq!(vault.direct_pool_deposit(BTC), Ok(sat(1_000)));
    assert_eq!(vault.pool_amount(BTC), sat(250_250));
    assert_eq!(vault.total_supply(SHARE), supply);
}

#[test]
fn withdraw_fees_is_gov_only_and_drains_reserve() {
    let mut vault = btc_pool();

    assert_eq!(vault.withdraw_fees(ALICE, BTC, ALICE), Err(VaultError::Forbidden));
    assert_eq!(vault.withdraw_fees(GOV, BTC, KEEPER), Ok(sat(750)));
    assert_eq!(vault.balance_of(KEEPER, BTC), sat(750));
    assert_eq!(vault.fee_reserves(BTC), U256::zero());
    assert_eq!(vault.withdraw_fees(GOV, BTC, KEEPER), Ok(U256::zero()));
}

// ---- swaps ----

#[test]
fn swap_prices_both_legs_and_moves_debt() {
    let mut vault = vault_with(1);
    push_btc(&mut vault, &[50000]);
    deposit(&mut vault, BOB, DAI, dai(100_000));
    vault.buy_usdg(DAI, BOB).unwrap();

    deposit(&mut vault, ALICE, BTC, sat(10_000_000));
    let result = vault.swap(BTC, DAI, ALICE).unwrap();

    assert_eq!(result.amount_in, sat(10_000_000));
    assert_eq!(result.amount_out, dai(4_985));
    assert_eq!(result.fee_amount, dai(15));
    assert_eq!(vault.balance_of(ALICE, DAI), dai(4_985));
    assert_eq!(vault.pool_amount(DAI), dai(94_700));
    assert_eq!(vault.pool_amount(BTC), sat(10_000_000));
    assert_eq!(vault.usdg_amount(BTC), dai(5_000));
    assert_eq!(vault.usdg_amount(DAI), dai(94_700));
}

#[test]
fn swap_rejects_same_asset_and_disabled_swaps() {
    let mut vault = vault_with(1);
    push_btc(&mut vault, &[50000]);
    deposit(&mut vault, ALICE, BTC, sat(1_000));

    assert_eq!(vault.swap(BTC, BTC, ALICE), Err(VaultError::InvalidPath));
    assert_eq!(vault.swap(BTC, AssetId(9), ALICE), Err(VaultError::AssetNotWhitelisted(AssetId(9))));

    vault.set_is_swap_enabled(GOV, false).unwrap();
    assert_eq!(vault.swap(BTC, DAI, ALICE), Err(VaultError::SwapsDisabled));
}

// ---- long positions ----

#[test]
fn increase_long_opens_at_max_price() {
    let vault = btc_long();
    let position = vault.position(&long_key(ALICE)).unwrap();

    assert_eq!(position.size, Usd::from_units(90));
    assert_eq!(position.collateral, usd(dec!(9.91)));
    assert_eq!(position.average_price, price(41000));
    assert_eq!(position.reserve_amount, sat(225_000));

    assert_eq!(vault.fee_reserves(BTC), sat(969));
    assert_eq!(vault.reserved_amount(BTC), sat(225_000));
    assert_eq!(vault.pool_amount(BTC), sat(274_031));
    assert_eq!(vault.guaranteed_usd(BTC), usd(dec!(80.09)));
}

#[test]
fn increase_long_updates_average_price() {
    let mut vault = btc_long();
    push_btc(&mut vault, &[45100, 46100, 47100]);

    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(10), Side::Long).unwrap();

    let key = long_key(ALICE);
    let position = vault.position(&key).unwrap().clone();
    let expected_average = Price::new(U256::from_dec_str("43211009174311926605504587155963302").unwrap()).unwrap();
    assert_eq!(position.size, Usd::from_units(100));
    assert_eq!(position.average_price, expected_average);
    assert_eq!(position.collateral, usd(dec!(9.90)));
    assert_eq!(position.reserve_amount, sat(247_172));

    assert_eq!(vault.fee_reserves(BTC), sat(990));
    assert_eq!(vault.pool_amount(BTC), sat(274_010));
    assert_eq!(vault.guaranteed_usd(BTC), usd(dec!(90.1)));
    assert_eq!(vault.get_position_leverage(&key), Ok(U256::from(101_010)));

    let delta = vault.get_position_delta(&key).unwrap();
    assert!(delta.has_profit);
    assert_eq!(delta.delta, raw_usd("4371549893842887473460721868365"));
}

#[test]
fn increase_long_beyond_pool_rolls_back() {
    let mut vault = btc_pool();
    deposit(&mut vault, ALICE, BTC, sat(25_000));
    let pool_before = vault.pool(BTC).cloned();
    let events_before = vault.event_count();

    let result = vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(110), Side::Long);

    assert!(matches!(result, Err(VaultError::InsufficientPoolLiquidity { .. })));
    assert_eq!(vault.pool(BTC).cloned(), pool_before);
    assert_eq!(vault.event_count(), events_before);
    assert!(vault.position(&long_key(ALICE)).is_none());
}

#[test]
fn decrease_long_rejects_oversized_requests() {
    let mut vault = btc_long();
    push_btc(&mut vault, &[45100, 46100, 47100]);

    let attempt = |vault: &mut Vault<SampledPriceFeed>, collateral: Usd, size: Usd| {
        vault.decrease_position(ALICE, ALICE, BTC, BTC, collateral, size, Side::Long, ALICE)
    };

    assert!(matches!(
        attempt(&mut vault, Usd::zero(), Usd::from_units(100)),
        Err(VaultError::PositionSizeExceeded { .. })
    ));
    assert!(matches!(
        attempt(&mut vault, Usd::from_units(10), Usd::from_units(50)),
        Err(VaultError::PositionCollateralExceeded { .. })
    ));
    assert_eq!(
        attempt(&mut vault, usd(dec!(8.91)), Usd::from_units(50)),
        Err(VaultError::LiquidationFeesExceedCollateral)
    );
    assert_eq!(vault.position(&long_key(ALICE)).unwrap().size, Usd::from_units(90));
}

#[test]
fn decrease_long_realises_profit() {
    let mut vault = btc_long();
    push_btc(&mut vault, &[45100, 46100, 47100]);

    let result = vault
        .decrease_position(ALICE, ALICE, BTC, BTC, Usd::from_units(3), Usd::from_units(50), Side::Long, ALICE)
        .unwrap();

    assert_eq!(result.amount_out, sat(16_878));
    assert_eq!(result.usd_out, Usd::from_units(8));
    assert_eq!(result.fee_usd, usd(dec!(0.05)));
    assert_eq!(result.realised_pnl, SignedUsd::profit(Usd::from_units(5)));
    assert!(!result.closed);

    let position = vault.position(&long_key(ALICE)).unwrap();
    assert_eq!(position.size, Usd::from_units(40));
    assert_eq!(position.collateral, usd(dec!(6.91)));
    assert_eq!(position.reserve_amount, sat(100_000));
    assert_eq!(position.realised_pnl, SignedUsd::profit(Usd::from_units(5)));

    assert_eq!(vault.balance_of(ALICE, BTC), sat(16_878));
    assert_eq!(vault.fee_reserves(BTC), sat(1_075));
    assert_eq!(vault.reserved_amount(BTC), sat(100_000));
    assert_eq!(vault.pool_amount(BTC), sat(274_031 - 16_985));
    assert_eq!(vault.guaranteed_usd(BTC), usd(dec!(33.09)));
}

#[test]
fn full_close_removes_position_and_guarantee() {
    let mut vault = btc_long();

    let result = vault
        .decrease_position(ALICE, ALICE, BTC, BTC, Usd::zero(), Usd::from_units(90), Side::Long, ALICE)
        .unwrap();

    assert!(result.closed);
    assert!(vault.position(&long_key(ALICE)).is_none());
    assert_eq!(vault.reserved_amount(BTC), U256::zero());
    assert_eq!(vault.guaranteed_usd(BTC), Usd::zero());
    assert!(matches!(vault.recent_events(1).next().map(|e| &e.payload), Some(EventPayload::ClosePosition(_))));
}

#[test]
fn open_then_close_at_flat_price_costs_two_position_fees() {
    let mut vault = vault_with(1);
    push_btc(&mut vault, &[40000]);
    deposit(&mut vault, BOB, BTC, sat(250_000));
    vault.buy_usdg(BTC, BOB).unwrap();
    deposit(&mut vault, ALICE, BTC, sat(25_000));
    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long).unwrap();

    let result = vault
        .decrease_position(ALICE, ALICE, BTC, BTC, Usd::zero(), Usd::from_units(90), Side::Long, ALICE)
        .unwrap();

    // 10 usd in, 0.09 out on open and again on close
    assert_eq!(result.usd_out, usd(dec!(9.91)));
    assert_eq!(result.fee_usd, usd(dec!(0.09)));
    assert_eq!(result.realised_pnl, SignedUsd::zero());
    assert_eq!(result.amount_out, sat(24_550));
    assert_eq!(vault.balance_of(ALICE, BTC), sat(24_550));

    assert_eq!(vault.fee_reserves(BTC), sat(750 + 225 + 225));
    assert_eq!(vault.pool_amount(BTC), sat(249_250));
    assert_eq!(vault.reserved_amount(BTC), U256::zero());
    assert_eq!(vault.guaranteed_usd(BTC), Usd::zero());
}

#[test]
fn min_profit_hides_small_gains_inside_window() {
    let mut vault = btc_long();
    let key = long_key(ALICE);

    push_btc(&mut vault, &[40999, 40999, 40999]);
    let delta = vault.get_position_delta(&key).unwrap();
    assert!(!delta.has_profit);
    assert_eq!(delta.delta, raw_usd("2195121951219512195121951219"));

    push_btc(&mut vault, &[41307, 41307, 41307]);
    assert_eq!(vault.get_position_delta(&key).unwrap().delta, Usd::zero());

    push_btc(&mut vault, &[41308, 41308, 41308]);
    let delta = vault.get_position_delta(&key).unwrap();
    assert!(delta.has_profit);
    assert_eq!(delta.delta, raw_usd("676097560975609756097560975609"));
}

#[test]
fn min_profit_window_closes_after_configured_time() {
    let mut vault = btc_long();
    vault.set_min_profit_time(GOV, 3600).unwrap();
    push_btc(&mut vault, &[41307, 41307, 41307]);
    let key = long_key(ALICE);

    assert_eq!(vault.get_position_delta(&key).unwrap().delta, Usd::zero());

    vault.advance_time(3601);
    assert_eq!(vault.get_position_delta(&key).unwrap().delta, raw_usd("673902439024390243902439024390"));
}

// ---- asset and caller checks ----

#[test]
fn position_asset_rules() {
    let mut vault = btc_pool();
    let eth = AssetId(4);
    vault.oracle_mut().set_latest_answer(eth, price(3000));
    vault
        .set_asset_config(GOV, eth, AssetConfig { is_shortable: false, ..AssetConfig::volatile(18) })
        .unwrap();
    let size = Usd::from_units(10);

    let mut open = |collateral, index, side| vault.increase_position(ALICE, ALICE, collateral, index, size, side);

    assert_eq!(open(DAI, BTC, Side::Long), Err(VaultError::MismatchedTokens { collateral: DAI, index: BTC }));
    assert_eq!(open(DAI, DAI, Side::Long), Err(VaultError::CollateralAssetMustNotBeStable(DAI)));
    assert_eq!(open(AssetId(9), AssetId(9), Side::Long), Err(VaultError::CollateralAssetNotWhitelisted(AssetId(9))));
    assert_eq!(open(BTC, BTC, Side::Short), Err(VaultError::CollateralAssetNotStable(BTC)));
    assert_eq!(open(DAI, DAI, Side::Short), Err(VaultError::IndexAssetMustNotBeStable(DAI)));
    assert_eq!(open(DAI, eth, Side::Short), Err(VaultError::IndexAssetNotShortable(eth)));
}

#[test]
fn only_owner_or_approved_plugin_may_act() {
    let mut vault = btc_pool();
    deposit(&mut vault, ALICE, BTC, sat(25_000));
    let size = Usd::from_units(90);

    assert_eq!(
        vault.increase_position(BOB, ALICE, BTC, BTC, size, Side::Long),
        Err(VaultError::InvalidSender { caller: BOB, account: ALICE })
    );

    // approval alone is not enough, the plugin must be registered too
    vault.approve_plugin(ALICE, BOB);
    assert!(vault.increase_position(BOB, ALICE, BTC, BTC, size, Side::Long).is_err());

    vault.add_router_plugin(GOV, BOB).unwrap();
    assert_eq!(vault.increase_position(BOB, ALICE, BTC, BTC, size, Side::Long), Ok(()));
}

#[test]
fn leverage_switch_blocks_increases() {
    let mut vault = btc_pool();
    vault.set_is_leverage_enabled(GOV, false).unwrap();
    deposit(&mut vault, ALICE, BTC, sat(25_000));

    assert_eq!(
        vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long),
        Err(VaultError::LeverageDisabled)
    );
}

// ---- governance ----

#[test]
fn governance_checks() {
    let mut vault = vault_with(1);

    assert_eq!(vault.initialize(GOV, VaultConfig::default()), Err(VaultError::AlreadyInitialized));
    assert_eq!(vault.set_fees(ALICE, 30, 4, 10, 30), Err(VaultError::Forbidden));
    assert!(matches!(vault.set_fees(GOV, 600, 4, 10, 30), Err(VaultError::InvalidConfig(_))));
    assert_eq!(vault.set_asset_config(GOV, SHARE, AssetConfig::stable(18)), Err(VaultError::Forbidden));
    assert_eq!(vault.mint_tokens(SHARE, ALICE, U256::one()), Err(VaultError::Forbidden));
    assert_eq!(vault.add_router_plugin(ALICE, BOOK), Err(VaultError::Forbidden));

    vault.transfer_governance(GOV, ALICE).unwrap();
    assert_eq!(vault.set_max_leverage(GOV, 200_000), Err(VaultError::Forbidden));
    assert_eq!(vault.set_max_leverage(ALICE, 200_000), Ok(()));
    assert_eq!(vault.config().max_leverage_bps, 200_000);
}

#[test]
fn uninitialized_vault_refuses_work() {
    let mut feed = SampledPriceFeed::new(PriceFeedConfig::default());
    feed.set_asset(DAI, 0, true);
    feed.set_latest_answer(DAI, Price::one_usd());
    let mut vault = Vault::new(GOV, VAULT, feed, EngineConfig::default());

    assert_eq!(vault.initialize(ALICE, VaultConfig::default()), Err(VaultError::Forbidden));
    assert_eq!(vault.buy_usdg(DAI, BOB), Err(VaultError::NotInitialized));
    assert!(!vault.is_initialized());
}

// ---- funding ----

#[test]
fn funding_accrues_on_reserved_share() {
    let mut vault = btc_long();
    assert_eq!(vault.get_next_funding_rate(BTC), Ok(U256::zero()));

    vault.advance_time(8 * 3600);
    // 600 * 225000 / 274031 for one interval
    assert_eq!(vault.get_next_funding_rate(BTC), Ok(U256::from(492)));
    vault.update_cumulative_funding_rate(BTC).unwrap();
    assert_eq!(vault.cumulative_funding_rate(BTC), U256::from(492));

    let (state, fees) = vault.validate_liquidation(ALICE, BTC, BTC, Side::Long, false).unwrap();
    assert_eq!(state, LiquidationState::NotLiquidatable);
    assert_eq!(fees, usd(dec!(0.13428)));
}

// ---- liquidation ----

fn dai_short() -> Vault<SampledPriceFeed> {
    let mut vault = vault_with(3);
    push_btc(&mut vault, &[40000, 40000, 40000]);
    deposit(&mut vault, BOB, DAI, dai(100));
    vault.buy_usdg(DAI, BOB).unwrap();
    deposit(&mut vault, ALICE, DAI, dai(10));
    vault.increase_position(ALICE, ALICE, DAI, BTC, Usd::from_units(90), Side::Short).unwrap();
    vault
}

#[test]
fn short_opens_against_stable_pool() {
    let vault = dai_short();
    let position = vault.position(&short_key(ALICE)).unwrap();

    assert_eq!(position.collateral, usd(dec!(9.91)));
    assert_eq!(position.average_price, price(40000));
    assert_eq!(vault.reserved_amount(DAI), dai(90));
    assert_eq!(vault.fee_reserves(DAI), expand_decimals(39, 16));
    assert_eq!(vault.pool_amount(DAI), expand_decimals(997, 17));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.global_short_size, Usd::from_units(90));
    assert_eq!(pool.global_short_average_price, Some(price(40000)));
}

#[test]
fn short_liquidation_by_losses() {
    let mut vault = dai_short();

    push_btc(&mut vault, &[39000, 39000, 39000]);
    let (state, _) = vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, false).unwrap();
    assert_eq!(state, LiquidationState::NotLiquidatable);

    push_btc(&mut vault, &[41000, 41000, 41000]);
    assert_eq!(
        vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER),
        Err(VaultError::PositionCannotBeLiquidated)
    );

    push_btc(&mut vault, &[42500, 42500, 42500]);
    let (state, fees) = vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, false).unwrap();
    assert_eq!(state, LiquidationState::LiquidatableByLosses);
    assert_eq!(fees, usd(dec!(0.09)));
    assert_eq!(
        vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, true),
        Err(VaultError::LiquidationFeesExceedCollateral)
    );

    let result = vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER).unwrap();

    assert_eq!(result.state, LiquidationState::LiquidatableByLosses);
    assert_eq!(result.liquidation_fee_tokens, dai(5));
    assert_eq!(vault.balance_of(KEEPER, DAI), dai(5));
    assert_eq!(vault.fee_reserves(DAI), expand_decimals(48, 16));
    assert_eq!(vault.reserved_amount(DAI), U256::zero());
    assert_eq!(vault.pool_amount(DAI), expand_decimals(10_452, 16));
    assert!(vault.position(&short_key(ALICE)).is_none());
    assert_eq!(vault.pool(BTC).unwrap().global_short_size, Usd::zero());
    assert_eq!(
        vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, false),
        Err(VaultError::EmptyPosition)
    );
}

#[test]
fn max_leverage_liquidation_closes_for_owner() {
    let mut vault = vault_with(3);
    push_btc(&mut vault, &[40000, 40000, 40000]);
    deposit(&mut vault, BOB, BTC, sat(250_000));
    vault.buy_usdg(BTC, BOB).unwrap();
    deposit(&mut vault, ALICE, BTC, sat(25_000));
    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long).unwrap();

    vault.set_max_leverage(GOV, 50_000).unwrap();
    let (state, _) = vault.validate_liquidation(ALICE, BTC, BTC, Side::Long, false).unwrap();
    assert_eq!(state, LiquidationState::LiquidatableByMaxLeverage);

    let result = vault.liquidate_position(KEEPER, ALICE, BTC, BTC, Side::Long, KEEPER).unwrap();

    assert_eq!(result.state, LiquidationState::LiquidatableByMaxLeverage);
    assert_eq!(result.liquidation_fee_tokens, U256::zero());
    // 9.91 collateral less the 0.09 close fee at 40000
    assert_eq!(vault.balance_of(ALICE, BTC), sat(24_550));
    assert_eq!(vault.balance_of(KEEPER, BTC), U256::zero());
    assert_eq!(vault.guaranteed_usd(BTC), Usd::zero());
    assert!(vault.position(&long_key(ALICE)).is_none());
}

#[test]
fn private_liquidation_mode_requires_liquidator() {
    let mut vault = dai_short();
    push_btc(&mut vault, &[42500, 42500, 42500]);
    vault.set_in_private_liquidation_mode(GOV, true).unwrap();

    assert_eq!(
        vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER),
        Err(VaultError::InvalidLiquidator(KEEPER))
    );

    vault.set_liquidator(GOV, KEEPER, true).unwrap();
    assert!(vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER).is_ok());
}

#[test]
fn liquidation_survives_asset_config_change() {
    let mut vault = dai_short();
    vault
        .set_asset_config(GOV, BTC, AssetConfig { is_shortable: false, ..AssetConfig::volatile(8) })
        .unwrap();
    push_btc(&mut vault, &[42500, 42500, 42500]);

    let (state, _) = vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, false).unwrap();
    assert_eq!(state, LiquidationState::LiquidatableByLosses);

    let result = vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER).unwrap();
    assert_eq!(result.state, LiquidationState::LiquidatableByLosses);
    assert_eq!(vault.balance_of(KEEPER, DAI), dai(5));
    assert_eq!(vault.pool_amount(DAI), expand_decimals(10_452, 16));
    assert!(vault.position(&short_key(ALICE)).is_none());

    // new shorts are still refused
    deposit(&mut vault, ALICE, DAI, dai(10));
    assert_eq!(
        vault.increase_position(ALICE, ALICE, DAI, BTC, Usd::from_units(90), Side::Short),
        Err(VaultError::IndexAssetNotShortable(BTC))
    );
}

#[test]
fn owner_closes_after_asset_is_delisted() {
    let mut vault = btc_long();
    vault.clear_asset_config(GOV, BTC).unwrap();

    let result = vault
        .decrease_position(ALICE, ALICE, BTC, BTC, Usd::zero(), Usd::from_units(90), Side::Long, ALICE)
        .unwrap();

    assert!(result.closed);
    assert!(result.amount_out > U256::zero());
    assert!(vault.position(&long_key(ALICE)).is_none());
    assert_eq!(vault.reserved_amount(BTC), U256::zero());
    assert_eq!(vault.guaranteed_usd(BTC), Usd::zero());

    deposit(&mut vault, ALICE, BTC, sat(25_000));
    assert_eq!(
        vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long),
        Err(VaultError::CollateralAssetNotWhitelisted(BTC))
    );
}

// ---- events ----

#[test]
fn journal_serializes_position_events() {
    let vault = btc_long();
    let kinds: Vec<String> = vault
        .events()
        .map(|event| serde_json::to_value(&event.payload).unwrap())
        .filter_map(|value| value.as_object().and_then(|o| o.keys().next().cloned()))
        .collect();

    assert!(kinds.iter().any(|k| k == "BuyUsdg"));
    assert!(kinds.iter().any(|k| k == "IncreasePosition"));
    assert_eq!(kinds.last().map(String::as_str), Some("UpdatePosition"));
}

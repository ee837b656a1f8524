//! Vault simulation.
//!
//! Walks the vault through its main flows: liquidity in, a leveraged long that
//! is grown and partly closed, a short that gets liquidated, a swap, and a
//! trigger order executed by a keeper.
//!
//! Set `RUST_LOG=perps_vault=debug` to see every step the vault logs.

use perps_vault::*;
use primitive_types::U256;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const GOV: AccountId = AccountId(1);
const VAULT: AccountId = AccountId(2);
const BOOK: AccountId = AccountId(3);
const ALICE: AccountId = AccountId(10);
const BOB: AccountId = AccountId(11);
const KEEPER: AccountId = AccountId(12);

const NATIVE: AssetId = AssetId(1);
const BTC: AssetId = AssetId(2);
const DAI: AssetId = AssetId(3);

type SimResult = Result<(), Box<dyn Error>>;

fn main() -> SimResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Leveraged Vault Simulation");
    println!("Shared pool, exact fixed-point accounting\n");

    scenario_1_long_lifecycle()?;
    scenario_2_short_liquidation()?;
    scenario_3_swap_and_redeem()?;
    scenario_4_trigger_orders()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn price(units: u64) -> Result<Price, Box<dyn Error>> {
    Price::from_units(units).ok_or_else(|| "price must be positive".into())
}

fn setup(sample_space: usize, btc_prices: &[u64]) -> Result<Vault<SampledPriceFeed>, Box<dyn Error>> {
    let mut feed = SampledPriceFeed::new(PriceFeedConfig { sample_space, ..PriceFeedConfig::default() });
    feed.set_asset(BTC, 0, false);
    feed.set_asset(DAI, 0, true);
    for units in btc_prices {
        feed.set_latest_answer(BTC, price(*units)?);
    }
    feed.set_latest_answer(DAI, Price::one_usd());

    let mut vault = Vault::new(GOV, VAULT, feed, EngineConfig::default());
    vault.initialize(GOV, VaultConfig::default())?;
    vault.set_asset_config(GOV, BTC, AssetConfig::volatile(8))?;
    vault.set_asset_config(GOV, DAI, AssetConfig::stable(18))?;
    Ok(vault)
}

fn deposit(vault: &mut Vault<SampledPriceFeed>, account: AccountId, asset: AssetId, amount: TokenAmount) -> SimResult {
    vault.mint_tokens(asset, account, amount)?;
    vault.transfer_tokens(account, asset, VAULT, amount)?;
    Ok(())
}

fn print_pool(vault: &Vault<SampledPriceFeed>, asset: AssetId) {
    if let Some(pool) = vault.pool(asset) {
        println!(
            "  Pool {}: amount {}, reserved {}, fees {}, guaranteed {}",
            asset, pool.pool_amount, pool.reserved_amount, pool.fee_reserves, pool.guaranteed_usd
        );
    }
}

/// Liquidity in, then a 90 USD long that grows and is partly closed.
fn scenario_1_long_lifecycle() -> SimResult {
    println!("Scenario 1: Long Position Lifecycle\n");

    let mut vault = setup(3, &[40000, 41000, 40000])?;

    deposit(&mut vault, BOB, BTC, U256::from(250_000u64))?;
    let minted = vault.buy_usdg(BTC, BOB)?;
    println!("  Bob adds 0.0025 BTC of liquidity, receives {} share units", minted);
    print_pool(&vault, BTC);

    deposit(&mut vault, ALICE, BTC, U256::from(25_000u64))?;
    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long)?;
    let key = PositionKey::new(ALICE, BTC, BTC, Side::Long);
    if let Some(position) = vault.position(&key) {
        println!("\n  Alice opens a 90 USD long: collateral {}, entry {}", position.collateral, position.average_price);
    }
    print_pool(&vault, BTC);

    for units in [45100, 46100, 47100] {
        vault.oracle_mut().set_latest_answer(BTC, price(units)?);
    }
    let delta = vault.get_position_delta(&key)?;
    println!("\n  BTC rallies to 45100-47100, unrealised profit {}", delta.delta);

    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(10), Side::Long)?;
    if let Some(position) = vault.position(&key) {
        println!("  Alice adds 10 USD of size, new average {}", position.average_price);
    }
    println!("  Leverage: {} bps", vault.get_position_leverage(&key)?);

    let result = vault.decrease_position(
        ALICE,
        ALICE,
        BTC,
        BTC,
        Usd::from_decimal(dec!(3)).ok_or("bad amount")?,
        Usd::from_decimal(dec!(50)).ok_or("bad amount")?,
        Side::Long,
        ALICE,
    )?;
    println!(
        "\n  Alice closes 50 USD: receives {} sat, realised {}, fee {}",
        result.amount_out, result.realised_pnl, result.fee_usd
    );
    print_pool(&vault, BTC);
    println!();
    Ok(())
}

/// A 9x short is liquidated when BTC moves 6% against it.
fn scenario_2_short_liquidation() -> SimResult {
    println!("Scenario 2: Short Liquidation\n");

    let mut vault = setup(3, &[40000, 40000, 40000])?;
    let dai = |units: u64| expand_decimals(units, 18);

    deposit(&mut vault, BOB, DAI, dai(100))?;
    vault.buy_usdg(DAI, BOB)?;

    deposit(&mut vault, ALICE, DAI, dai(10))?;
    vault.increase_position(ALICE, ALICE, DAI, BTC, Usd::from_units(90), Side::Short)?;
    println!("  Alice shorts 90 USD of BTC with 10 DAI at 40000");

    for units in [42500, 42500, 42500] {
        vault.oracle_mut().set_latest_answer(BTC, price(units)?);
    }
    let (state, fees) = vault.validate_liquidation(ALICE, DAI, BTC, Side::Short, false)?;
    println!("  BTC at 42500: {:?}, margin fees {}", state, fees);

    let result = vault.liquidate_position(KEEPER, ALICE, DAI, BTC, Side::Short, KEEPER)?;
    println!(
        "  Keeper liquidates, receives {} DAI units",
        result.liquidation_fee_tokens
    );
    print_pool(&vault, DAI);
    println!();
    Ok(())
}

/// BTC swapped for DAI, then share tokens redeemed.
fn scenario_3_swap_and_redeem() -> SimResult {
    println!("Scenario 3: Swap and Redeem\n");

    let mut vault = setup(1, &[50000])?;
    let dai = |units: u64| expand_decimals(units, 18);

    deposit(&mut vault, BOB, DAI, dai(100_000))?;
    let shares = vault.buy_usdg(DAI, BOB)?;
    deposit(&mut vault, BOB, BTC, expand_decimals(1, 8))?;
    vault.buy_usdg(BTC, BOB)?;

    deposit(&mut vault, ALICE, BTC, U256::from(10_000_000u64))?;
    let swap = vault.swap(BTC, DAI, ALICE)?;
    println!("  Alice swaps 0.1 BTC for {} DAI units, fee {}", swap.amount_out, swap.fee_amount);

    let half = shares / 2;
    let share_asset = vault.config().share_asset;
    vault.transfer_tokens(BOB, share_asset, VAULT, half)?;
    let out = vault.sell_usdg(DAI, BOB)?;
    println!("  Bob redeems {} share units for {} DAI units", half, out);
    print_pool(&vault, DAI);

    let fees = vault.withdraw_fees(GOV, DAI, GOV)?;
    println!("  Governance withdraws {} DAI units of fees\n", fees);
    Ok(())
}

/// A take-profit style decrease order executed by a keeper.
fn scenario_4_trigger_orders() -> SimResult {
    println!("Scenario 4: Trigger Orders\n");

    // single round sampling so the keeper sees the new price at once
    let mut vault = setup(1, &[60000])?;
    let mut book = OrderBook::new(GOV, BOOK);
    book.initialize(GOV, OrderBookConfig::default())?;
    vault.add_router_plugin(GOV, BOOK)?;
    vault.approve_plugin(ALICE, BOOK);

    deposit(&mut vault, BOB, BTC, expand_decimals(100, 8))?;
    vault.direct_pool_deposit(BTC)?;

    deposit(&mut vault, ALICE, BTC, U256::from(16_666_666u64))?;
    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(20000), Side::Long)?;

    let fee = book.config().min_execution_fee;
    vault.mint_tokens(NATIVE, ALICE, fee)?;
    let size = vault.get_position(ALICE, BTC, BTC, Side::Long).map(|p| p.size).unwrap_or_default();
    let index = book.create_decrease_order(
        &mut vault,
        ALICE,
        DecreaseOrderRequest {
            index_asset: BTC,
            size_delta: size,
            collateral_asset: BTC,
            collateral_delta: Usd::zero(),
            side: Side::Long,
            trigger_price: price(65000)?,
            trigger_above_threshold: true,
            execution_fee: fee,
        },
        fee,
    )?;
    println!("  Alice places a close order at 65000 (index {})", index);

    if let Err(err) = book.execute_decrease_order(&mut vault, ALICE, index, KEEPER) {
        println!("  Keeper tries at 60000: {}", err);
    }

    vault.oracle_mut().set_latest_answer(BTC, price(65050)?);
    let executed_at = book.execute_decrease_order(&mut vault, ALICE, index, KEEPER)?;
    println!(
        "  Executed at {}: Alice holds {} sat, keeper earned {}",
        executed_at,
        vault.balance_of(ALICE, BTC),
        vault.balance_of(KEEPER, NATIVE)
    );
    println!("  Journal holds {} events", vault.event_count());
    Ok(())
}

//! Shared fixtures: one vault with a BTC pool and a DAI pool, fed by a sampled feed.

#![allow(dead_code)]

use perps_vault::*;
use primitive_types::U256;
use rust_decimal::Decimal;

pub const GOV: AccountId = AccountId(1);
pub const VAULT: AccountId = AccountId(2);
pub const BOOK: AccountId = AccountId(3);
pub const ALICE: AccountId = AccountId(10);
pub const BOB: AccountId = AccountId(11);
pub const KEEPER: AccountId = AccountId(12);

pub const SHARE: AssetId = AssetId(0);
pub const NATIVE: AssetId = AssetId(1);
pub const BTC: AssetId = AssetId(2);
pub const DAI: AssetId = AssetId(3);

pub fn price(units: u64) -> Price {
    Price::from_units(units).unwrap()
}

pub fn usd(value: Decimal) -> Usd {
    Usd::from_decimal(value).unwrap()
}

pub fn raw_usd(digits: &str) -> Usd {
    Usd::new(U256::from_dec_str(digits).unwrap())
}

pub fn sat(amount: u64) -> TokenAmount {
    U256::from(amount)
}

pub fn dai(units: u64) -> TokenAmount {
    expand_decimals(units, 18)
}

/// Initialized vault with BTC (8 decimals) and DAI (18 decimals, strict stable).
/// BTC has no price yet.
pub fn vault_with(sample_space: usize) -> Vault<SampledPriceFeed> {
    let mut feed = SampledPriceFeed::new(PriceFeedConfig { sample_space, ..PriceFeedConfig::default() });
    feed.set_asset(BTC, 0, false);
    feed.set_asset(DAI, 0, true);
    feed.set_latest_answer(DAI, Price::one_usd());

    let mut vault = Vault::new(GOV, VAULT, feed, EngineConfig::default());
    vault.initialize(GOV, VaultConfig::default()).unwrap();
    vault.set_asset_config(GOV, BTC, AssetConfig::volatile(8)).unwrap();
    vault.set_asset_config(GOV, DAI, AssetConfig::stable(18)).unwrap();
    vault
}

pub fn push_btc(vault: &mut Vault<SampledPriceFeed>, rounds: &[u64]) {
    for units in rounds {
        vault.oracle_mut().set_latest_answer(BTC, price(*units));
    }
}

/// Mint to `account` and send it straight to the vault as a pending deposit.
pub fn deposit(vault: &mut Vault<SampledPriceFeed>, account: AccountId, asset: AssetId, amount: TokenAmount) {
    vault.mint_tokens(asset, account, amount).unwrap();
    vault.transfer_tokens(account, asset, VAULT, amount).unwrap();
}

/// BTC at 40000/41000/40000 with 0.0025 BTC of liquidity from Bob.
pub fn btc_pool() -> Vault<SampledPriceFeed> {
    let mut vault = vault_with(3);
    push_btc(&mut vault, &[40000, 41000, 40000]);
    deposit(&mut vault, BOB, BTC, sat(250_000));
    vault.buy_usdg(BTC, BOB).unwrap();
    vault
}

/// `btc_pool` plus Alice's 90 USD long on 0.00025 BTC.
pub fn btc_long() -> Vault<SampledPriceFeed> {
    let mut vault = btc_pool();
    deposit(&mut vault, ALICE, BTC, sat(25_000));
    vault.increase_position(ALICE, ALICE, BTC, BTC, Usd::from_units(90), Side::Long).unwrap();
    vault
}

pub fn long_key(account: AccountId) -> PositionKey {
    PositionKey::new(account, BTC, BTC, Side::Long)
}

pub fn short_key(account: AccountId) -> PositionKey {
    PositionKey::new(account, DAI, BTC, Side::Short)
}

// 8.0 vault/core.rs: main vault. holds the pool ledger, positions, token balances,
// governance state and the event journal. every public mutation runs as one atomic unit.

use super::config::EngineConfig;
use super::ledger::Ledger;
use super::results::VaultError;
use crate::config::{AssetConfig, VaultConfig};
use crate::events::{Event, EventJournal, EventPayload};
use crate::pool::PoolState;
use crate::position::{Position, PositionKey};
use crate::price_feed::PriceOracle;
use crate::router::{Router, RouterApprovals};
use crate::types::{AccountId, AssetId, Side, Timestamp, TokenAmount, Usd};
use primitive_types::U256;
use std::collections::{HashMap, HashSet};

/** 8.1: main vault struct. all state lives here */
#[derive(Debug)]
pub struct Vault<O: PriceOracle> {
    pub(super) engine: EngineConfig,
    pub(super) config: VaultConfig,
    pub(super) gov: AccountId,
    pub(super) account: AccountId,
    pub(super) is_initialized: bool,
    pub(super) assets: HashMap<AssetId, AssetConfig>,
    // outlives a cleared config so open positions can still be priced
    pub(super) asset_decimals: HashMap<AssetId, u32>,
    pub(super) liquidators: HashSet<AccountId>,
    pub(super) router: Router,
    pub(super) oracle: O,
    pub(super) ledger: Ledger,
    pub(super) events: EventJournal,
    pub(super) current_time: Timestamp,
}

impl<O: PriceOracle> Vault<O> {
    /// `account` is the vault's own holder id in the token ledger.
    pub fn new(gov: AccountId, account: AccountId, oracle: O, engine: EngineConfig) -> Self {
        let events = EventJournal::new(engine.max_events);
        Self {
            engine,
            config: VaultConfig::default(),
            gov,
            account,
            is_initialized: false,
            assets: HashMap::new(),
            asset_decimals: HashMap::new(),
            liquidators: HashSet::new(),
            router: Router::new(),
            oracle,
            ledger: Ledger::default(),
            events,
            current_time: Timestamp::default(),
        }
    }

    pub fn initialize(&mut self, caller: AccountId, config: VaultConfig) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        if self.is_initialized {
            return Err(VaultError::AlreadyInitialized);
        }
        config.validate()?;
        self.config = config;
        self.is_initialized = true;
        tracing::info!(gov = %self.gov, vault = %self.account, "vault initialized");
        Ok(())
    }

    /// Runs `unit` and restores the ledger and journal if it fails.
    pub fn atomic<T, E>(&mut self, unit: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let ledger_mark = self.ledger.begin();
        let mark = self.events.mark();
        match unit(self) {
            Ok(value) => {
                self.ledger.commit();
                Ok(value)
            }
            Err(err) => {
                self.ledger.rollback(ledger_mark);
                self.events.rollback_to(mark);
                tracing::debug!(error = %err, "unit rolled back");
                Err(err)
            }
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn gov(&self) -> AccountId {
        self.gov
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    // ---- governance ----

    pub fn transfer_governance(&mut self, caller: AccountId, new_gov: AccountId) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        tracing::info!(from = %self.gov, to = %new_gov, "governance transferred");
        self.gov = new_gov;
        Ok(())
    }

    pub fn set_asset_config(&mut self, caller: AccountId, asset: AssetId, config: AssetConfig) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        if asset == self.config.share_asset {
            return Err(VaultError::Forbidden);
        }
        config.validate()?;
        self.asset_decimals.insert(asset, config.decimals);
        self.assets.insert(asset, config);
        Ok(())
    }

    pub fn clear_asset_config(&mut self, caller: AccountId, asset: AssetId) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        self.assets.remove(&asset).ok_or(VaultError::AssetNotWhitelisted(asset))?;
        Ok(())
    }

    pub fn set_fees(
        &mut self,
        caller: AccountId,
        swap_fee_bps: u32,
        stable_swap_fee_bps: u32,
        margin_fee_bps: u32,
        mint_burn_fee_bps: u32,
    ) -> Result<(), VaultError> {
        self.update_config(caller, |c| {
            c.swap_fee_bps = swap_fee_bps;
            c.stable_swap_fee_bps = stable_swap_fee_bps;
            c.margin_fee_bps = margin_fee_bps;
            c.mint_burn_fee_bps = mint_burn_fee_bps;
        })
    }

    pub fn set_max_leverage(&mut self, caller: AccountId, max_leverage_bps: u32) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.max_leverage_bps = max_leverage_bps)
    }

    pub fn set_liquidation_fee_usd(&mut self, caller: AccountId, fee: Usd) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.liquidation_fee_usd = fee)
    }

    pub fn set_funding_rate(
        &mut self,
        caller: AccountId,
        interval_secs: u64,
        rate_factor: u32,
        stable_rate_factor: u32,
    ) -> Result<(), VaultError> {
        self.update_config(caller, |c| {
            c.funding_interval_secs = interval_secs;
            c.funding_rate_factor = rate_factor;
            c.stable_funding_rate_factor = stable_rate_factor;
        })
    }

    pub fn set_min_profit_time(&mut self, caller: AccountId, secs: u64) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.min_profit_time_secs = secs)
    }

    pub fn set_is_swap_enabled(&mut self, caller: AccountId, enabled: bool) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.is_swap_enabled = enabled)
    }

    pub fn set_is_leverage_enabled(&mut self, caller: AccountId, enabled: bool) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.is_leverage_enabled = enabled)
    }

    pub fn set_in_private_liquidation_mode(&mut self, caller: AccountId, enabled: bool) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.in_private_liquidation_mode = enabled)
    }

    pub fn set_allow_cross_collateral_longs(&mut self, caller: AccountId, allowed: bool) -> Result<(), VaultError> {
        self.update_config(caller, |c| c.allow_cross_collateral_longs = allowed)
    }

    pub fn set_liquidator(&mut self, caller: AccountId, liquidator: AccountId, active: bool) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        if active {
            self.liquidators.insert(liquidator);
        } else {
            self.liquidators.remove(&liquidator);
        }
        Ok(())
    }

    pub fn add_router_plugin(&mut self, caller: AccountId, plugin: AccountId) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        self.router.add_plugin(plugin);
        Ok(())
    }

    pub fn remove_router_plugin(&mut self, caller: AccountId, plugin: AccountId) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        self.router.remove_plugin(plugin);
        Ok(())
    }

    /// Called by the account itself.
    pub fn approve_plugin(&mut self, account: AccountId, plugin: AccountId) {
        self.router.approve_plugin(account, plugin);
    }

    pub fn deny_plugin(&mut self, account: AccountId, plugin: AccountId) {
        self.router.deny_plugin(account, plugin);
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    fn update_config(&mut self, caller: AccountId, apply: impl FnOnce(&mut VaultConfig)) -> Result<(), VaultError> {
        self.ensure_gov(caller)?;
        let mut next = self.config.clone();
        apply(&mut next);
        next.validate()?;
        self.config = next;
        Ok(())
    }

    pub(super) fn ensure_gov(&self, caller: AccountId) -> Result<(), VaultError> {
        if caller != self.gov {
            return Err(VaultError::Forbidden);
        }
        Ok(())
    }

    pub(super) fn ensure_initialized(&self) -> Result<(), VaultError> {
        if !self.is_initialized {
            return Err(VaultError::NotInitialized);
        }
        Ok(())
    }

    // caller acts for itself or as a plugin the account approved
    pub(super) fn validate_sender(&self, caller: AccountId, account: AccountId) -> Result<(), VaultError> {
        if caller == account || self.router.is_approved_plugin(account, caller) {
            return Ok(());
        }
        Err(VaultError::InvalidSender { caller, account })
    }

    // ---- assets ----

    pub fn asset_config(&self, asset: AssetId) -> Option<&AssetConfig> {
        self.assets.get(&asset)
    }

    pub fn is_whitelisted(&self, asset: AssetId) -> bool {
        self.assets.contains_key(&asset)
    }

    pub(super) fn whitelisted(&self, asset: AssetId) -> Result<&AssetConfig, VaultError> {
        self.assets.get(&asset).ok_or(VaultError::AssetNotWhitelisted(asset))
    }

    fn whitelisted_collateral(&self, asset: AssetId) -> Result<&AssetConfig, VaultError> {
        self.assets.get(&asset).ok_or(VaultError::CollateralAssetNotWhitelisted(asset))
    }

    pub(super) fn is_stable(&self, asset: AssetId) -> bool {
        self.assets.get(&asset).map_or(false, |a| a.is_stable)
    }

    /// Longs post the index asset (unless cross collateral is allowed) and never a
    /// stable. Shorts post a stable against a shortable volatile index.
    pub(super) fn validate_assets(&self, collateral: AssetId, index: AssetId, side: Side) -> Result<(), VaultError> {
        match side {
            Side::Long => {
                if collateral != index && !self.config.allow_cross_collateral_longs {
                    return Err(VaultError::MismatchedTokens { collateral, index });
                }
                let collateral_config = self.whitelisted_collateral(collateral)?;
                if collateral_config.is_stable {
                    return Err(VaultError::CollateralAssetMustNotBeStable(collateral));
                }
                if collateral != index {
                    self.whitelisted(index)?;
                }
            }
            Side::Short => {
                let collateral_config = self.whitelisted_collateral(collateral)?;
                if !collateral_config.is_stable {
                    return Err(VaultError::CollateralAssetNotStable(collateral));
                }
                if self.is_stable(index) {
                    return Err(VaultError::IndexAssetMustNotBeStable(index));
                }
                if !self.assets.get(&index).map_or(false, |a| a.is_shortable) {
                    return Err(VaultError::IndexAssetNotShortable(index));
                }
            }
        }
        Ok(())
    }

    // ---- tokens ----

    pub fn balance_of(&self, holder: AccountId, asset: AssetId) -> TokenAmount {
        self.ledger.balance_of(holder, asset)
    }

    pub fn total_supply(&self, asset: AssetId) -> TokenAmount {
        self.ledger.total_supply(asset)
    }

    /// Faucet for any asset except the share token, which only the vault mints.
    pub fn mint_tokens(&mut self, asset: AssetId, to: AccountId, amount: TokenAmount) -> Result<(), VaultError> {
        if asset == self.config.share_asset {
            return Err(VaultError::Forbidden);
        }
        self.ledger.mint(asset, to, amount)?;
        Ok(())
    }

    /// Plain transfer signed by `from`. Sending to the vault is how deposits arrive.
    pub fn transfer_tokens(
        &mut self,
        from: AccountId,
        asset: AssetId,
        to: AccountId,
        amount: TokenAmount,
    ) -> Result<(), VaultError> {
        self.ledger.transfer(asset, from, to, amount)?;
        Ok(())
    }

    /// Transfer out of `account` by an approved router plugin.
    pub fn plugin_transfer(
        &mut self,
        plugin: AccountId,
        asset: AssetId,
        account: AccountId,
        to: AccountId,
        amount: TokenAmount,
    ) -> Result<(), VaultError> {
        if !self.router.is_approved_plugin(account, plugin) {
            return Err(VaultError::InvalidSender { caller: plugin, account });
        }
        self.transfer_tokens(account, asset, to, amount)
    }

    // what arrived since the last recorded balance
    pub(super) fn transfer_in(&mut self, asset: AssetId) -> Result<TokenAmount, VaultError> {
        let previous = self.ledger.recorded_balance(asset);
        let current = self.ledger.balance_of(self.account, asset);
        self.ledger.set_recorded_balance(asset, current);
        Ok(current.saturating_sub(previous))
    }

    pub(super) fn transfer_out(&mut self, asset: AssetId, amount: TokenAmount, receiver: AccountId) -> Result<(), VaultError> {
        self.ledger.transfer(asset, self.account, receiver, amount)?;
        self.sync_recorded_balance(asset);
        Ok(())
    }

    pub(super) fn sync_recorded_balance(&mut self, asset: AssetId) {
        let current = self.ledger.balance_of(self.account, asset);
        self.ledger.set_recorded_balance(asset, current);
    }

    pub(super) fn mint_shares(&mut self, to: AccountId, amount: TokenAmount) -> Result<(), VaultError> {
        let share = self.config.share_asset;
        self.ledger.mint(share, to, amount)?;
        Ok(())
    }

    pub(super) fn burn_shares(&mut self, from: AccountId, amount: TokenAmount) -> Result<(), VaultError> {
        let share = self.config.share_asset;
        self.ledger.burn(share, from, amount)?;
        Ok(())
    }

    // ---- ledger views ----

    pub fn pool(&self, asset: AssetId) -> Option<&PoolState> {
        self.ledger.pool(asset)
    }

    pub fn pool_amount(&self, asset: AssetId) -> TokenAmount {
        self.pool(asset).map(|p| p.pool_amount).unwrap_or_default()
    }

    pub fn reserved_amount(&self, asset: AssetId) -> TokenAmount {
        self.pool(asset).map(|p| p.reserved_amount).unwrap_or_default()
    }

    pub fn fee_reserves(&self, asset: AssetId) -> TokenAmount {
        self.pool(asset).map(|p| p.fee_reserves).unwrap_or_default()
    }

    pub fn guaranteed_usd(&self, asset: AssetId) -> Usd {
        self.pool(asset).map(|p| p.guaranteed_usd).unwrap_or_default()
    }

    pub fn usdg_amount(&self, asset: AssetId) -> TokenAmount {
        self.pool(asset).map(|p| p.usdg_amount).unwrap_or_default()
    }

    pub fn cumulative_funding_rate(&self, asset: AssetId) -> U256 {
        self.pool(asset).map(|p| p.cumulative_funding_rate).unwrap_or_default()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.ledger.positions()
    }

    pub(super) fn pool_mut(&mut self, asset: AssetId) -> &mut PoolState {
        self.ledger.pool_mut(asset)
    }

    // ---- events ----

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn recent_events(&self, count: usize) -> impl Iterator<Item = &Event> {
        self.events.recent(count)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    // order book events land in the same journal
    pub(crate) fn emit_event(&mut self, payload: EventPayload) {
        if self.engine.verbose {
            tracing::debug!(payload = ?payload, "vault event");
        }
        let id = self.events.push(self.current_time, payload);
        tracing::trace!(event_id = id.0, "event recorded");
    }
}

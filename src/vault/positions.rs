//! Position increase and decrease against the shared pool.

use super::core::Vault;
use super::results::{DecreaseResult, VaultError};
use crate::events::{EventPayload, FeeEvent, PositionChangeEvent, PositionSnapshotEvent};
use crate::position::{
    calculate_delta, min_profit_window_open, next_average_price, position_fee, Position, PositionDelta, PositionKey,
};
use crate::price_feed::PriceOracle;
use crate::types::{AccountId, AssetId, Price, Side, SignedUsd, Timestamp, Usd};
use primitive_types::U256;

// collateral usd moved by reduce_collateral
struct CollateralRelease {
    usd_out: Usd,
    usd_out_after_fee: Usd,
    fee: Usd,
    realised: SignedUsd,
}

impl<O: PriceOracle> Vault<O> {
    /// Open or grow a position. Collateral is whatever the caller sent to the
    /// vault in `collateral_asset` since the last recorded balance.
    pub fn increase_position(
        &mut self,
        caller: AccountId,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        size_delta: Usd,
        side: Side,
    ) -> Result<(), VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            if !vault.config.is_leverage_enabled {
                return Err(VaultError::LeverageDisabled);
            }
            vault.validate_sender(caller, account)?;
            vault.apply_increase(account, collateral_asset, index_asset, size_delta, side)
        })
    }

    /// Shrink or close a position, paying the released usd to `receiver`.
    /// Returns the tokens sent.
    #[allow(clippy::too_many_arguments)]
    pub fn decrease_position(
        &mut self,
        caller: AccountId,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        collateral_delta: Usd,
        size_delta: Usd,
        side: Side,
        receiver: AccountId,
    ) -> Result<DecreaseResult, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            vault.validate_sender(caller, account)?;
            let key = PositionKey::new(account, collateral_asset, index_asset, side);
            vault.apply_decrease(key, collateral_delta, size_delta, receiver)
        })
    }

    pub(super) fn apply_increase(
        &mut self,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        size_delta: Usd,
        side: Side,
    ) -> Result<(), VaultError> {
        self.validate_assets(collateral_asset, index_asset, side)?;
        self.update_cumulative_funding_rate(collateral_asset)?;

        let key = PositionKey::new(account, collateral_asset, index_asset, side);
        let price = self.entry_price(index_asset, side)?;
        let now = self.current_time;

        let mut position = self
            .ledger
            .position(&key)
            .cloned()
            .unwrap_or_else(|| Position::opening(price, now));

        if position.size.is_zero() {
            position.average_price = price;
        } else if !size_delta.is_zero() {
            position.average_price = self.get_next_average_price(
                index_asset,
                position.size,
                position.average_price,
                side,
                price,
                size_delta,
                position.last_increased_time,
            )?;
        }

        let fee = self.collect_margin_fees(collateral_asset, size_delta, position.size, position.entry_funding_rate)?;
        let collateral_tokens = self.transfer_in(collateral_asset)?;
        let collateral_delta_usd = self.token_to_usd_min(collateral_asset, collateral_tokens)?;

        position.collateral = position.collateral.checked_add(collateral_delta_usd)?;
        if position.collateral < fee {
            return Err(VaultError::InsufficientCollateral { collateral: position.collateral, fee });
        }
        position.collateral = position.collateral.checked_sub(fee)?;
        position.entry_funding_rate = self.cumulative_funding_rate(collateral_asset);
        position.size = position.size.checked_add(size_delta)?;
        position.last_increased_time = now;

        if position.size.is_zero() {
            return Err(VaultError::InvalidPositionSize { size: position.size, collateral: position.collateral });
        }
        validate_position(&position)?;
        self.check_liquidation(&key, &position)?.ensure_safe()?;

        // reserve before the collateral lands in the pool
        let reserve_delta = self.usd_to_token_max(collateral_asset, size_delta)?;
        position.reserve_amount = position.reserve_amount.saturating_add(reserve_delta);
        self.pool_mut(collateral_asset).increase_reserved_amount(reserve_delta)?;

        match side {
            Side::Long => {
                // the pool now guarantees size minus what the trader put up
                let fee_tokens = self.usd_to_token_min(collateral_asset, fee)?;
                let pool = self.pool_mut(collateral_asset);
                pool.increase_guaranteed_usd(size_delta.checked_add(fee)?)?;
                pool.decrease_guaranteed_usd(collateral_delta_usd)?;
                pool.increase_pool_amount(collateral_tokens)?;
                pool.decrease_pool_amount(fee_tokens)?;
            }
            Side::Short => {
                self.pool_mut(index_asset).increase_global_short(price, size_delta)?;
            }
        }

        tracing::info!(
            account = %account,
            side = ?side,
            size = %position.size,
            collateral = %position.collateral,
            average_price = %position.average_price,
            "position increased"
        );

        self.emit_event(EventPayload::IncreasePosition(PositionChangeEvent {
            key,
            collateral_delta: collateral_delta_usd,
            size_delta,
            price,
            fee,
        }));
        self.emit_event(EventPayload::UpdatePosition(snapshot(key, &position)));
        self.ledger.insert_position(key, position);
        Ok(())
    }

    pub(super) fn apply_decrease(
        &mut self,
        key: PositionKey,
        collateral_delta: Usd,
        size_delta: Usd,
        receiver: AccountId,
    ) -> Result<DecreaseResult, VaultError> {
        // current asset configs do not gate exits
        let PositionKey { collateral_asset, index_asset, side, .. } = key;
        self.update_cumulative_funding_rate(collateral_asset)?;

        let mut position = match self.ledger.position(&key) {
            Some(position) if !position.is_empty() => position.clone(),
            _ => return Err(VaultError::EmptyPosition),
        };
        if size_delta > position.size {
            return Err(VaultError::PositionSizeExceeded { size: position.size, requested: size_delta });
        }
        if collateral_delta > position.collateral {
            return Err(VaultError::PositionCollateralExceeded {
                collateral: position.collateral,
                requested: collateral_delta,
            });
        }

        let collateral_before = position.collateral;
        let reserve_delta = position.reserve_for(size_delta)?;
        position.reserve_amount = position.reserve_amount.saturating_sub(reserve_delta);
        self.pool_mut(collateral_asset).decrease_reserved_amount(reserve_delta)?;

        let release = self.reduce_collateral(&key, &mut position, collateral_delta, size_delta)?;
        let price = self.mark_price(index_asset, side)?;
        let closed = position.size == size_delta;

        let change = PositionChangeEvent { key, collateral_delta, size_delta, price, fee: release.fee };

        if !closed {
            position.entry_funding_rate = self.cumulative_funding_rate(collateral_asset);
            position.size = position.size.checked_sub(size_delta)?;
            validate_position(&position)?;
            self.check_liquidation(&key, &position)?.ensure_safe()?;

            if side.is_long() {
                let released = collateral_before.checked_sub(position.collateral)?;
                let pool = self.pool_mut(collateral_asset);
                pool.increase_guaranteed_usd(released)?;
                pool.decrease_guaranteed_usd(size_delta)?;
            }

            self.emit_event(EventPayload::DecreasePosition(change));
            self.emit_event(EventPayload::UpdatePosition(snapshot(key, &position)));
            self.ledger.insert_position(key, position.clone());
        } else {
            if side.is_long() {
                let pool = self.pool_mut(collateral_asset);
                pool.increase_guaranteed_usd(collateral_before)?;
                pool.decrease_guaranteed_usd(size_delta)?;
            }

            self.emit_event(EventPayload::DecreasePosition(change));
            let mut final_state = position.clone();
            final_state.size = Usd::zero();
            self.emit_event(EventPayload::ClosePosition(snapshot(key, &final_state)));
            self.ledger.remove_position(&key);
        }

        if !side.is_long() {
            self.pool_mut(index_asset).decrease_global_short(size_delta);
        }

        let mut amount_out = U256::zero();
        if !release.usd_out.is_zero() {
            if side.is_long() {
                let tokens = self.usd_to_token_min(collateral_asset, release.usd_out)?;
                self.pool_mut(collateral_asset).decrease_pool_amount(tokens)?;
            }
            amount_out = self.usd_to_token_min(collateral_asset, release.usd_out_after_fee)?;
            self.transfer_out(collateral_asset, amount_out, receiver)?;
        }

        tracing::info!(
            account = %key.account,
            side = ?side,
            size_delta = %size_delta,
            usd_out = %release.usd_out,
            closed,
            "position decreased"
        );

        Ok(DecreaseResult {
            amount_out,
            usd_out: release.usd_out,
            fee_usd: release.fee,
            realised_pnl: release.realised,
            closed,
        })
    }

    // settles fees, pnl and withdrawn collateral for a decrease of size_delta
    fn reduce_collateral(
        &mut self,
        key: &PositionKey,
        position: &mut Position,
        collateral_delta: Usd,
        size_delta: Usd,
    ) -> Result<CollateralRelease, VaultError> {
        let collateral_asset = key.collateral_asset;
        let fee = self.collect_margin_fees(collateral_asset, size_delta, position.size, position.entry_funding_rate)?;

        let delta = self.get_delta(
            key.index_asset,
            position.size,
            position.average_price,
            key.side,
            position.last_increased_time,
        )?;
        let adjusted = delta.pro_rata(size_delta, position.size)?;

        let mut usd_out = Usd::zero();
        let mut realised = SignedUsd::zero();
        if !adjusted.is_zero() {
            if delta.has_profit {
                usd_out = adjusted;
                realised = SignedUsd::profit(adjusted);
                position.realised_pnl = position.realised_pnl.add_profit(adjusted)?;
                // short profits are paid from the stable pool
                if !key.side.is_long() {
                    let tokens = self.usd_to_token_min(collateral_asset, adjusted)?;
                    self.pool_mut(collateral_asset).decrease_pool_amount(tokens)?;
                }
            } else {
                position.collateral = position
                    .collateral
                    .checked_sub(adjusted)
                    .map_err(|_| VaultError::LossesExceedCollateral)?;
                if !key.side.is_long() {
                    let tokens = self.usd_to_token_min(collateral_asset, adjusted)?;
                    self.pool_mut(collateral_asset).increase_pool_amount(tokens)?;
                }
                position.realised_pnl = position.realised_pnl.add_loss(adjusted)?;
                realised = SignedUsd::loss(adjusted);
            }
        }

        if !collateral_delta.is_zero() {
            usd_out = usd_out.checked_add(collateral_delta)?;
            position.collateral = position.collateral.checked_sub(collateral_delta).map_err(|_| {
                VaultError::PositionCollateralExceeded { collateral: position.collateral, requested: collateral_delta }
            })?;
        }

        if position.size == size_delta {
            usd_out = usd_out.checked_add(position.collateral)?;
            position.collateral = Usd::zero();
        }

        let usd_out_after_fee = if usd_out > fee {
            usd_out.checked_sub(fee)?
        } else {
            // fee comes out of the remaining collateral instead
            position.collateral = position
                .collateral
                .checked_sub(fee)
                .map_err(|_| VaultError::FeesExceedCollateral)?;
            if key.side.is_long() {
                let fee_tokens = self.usd_to_token_min(collateral_asset, fee)?;
                self.pool_mut(collateral_asset).decrease_pool_amount(fee_tokens)?;
            }
            usd_out
        };

        Ok(CollateralRelease { usd_out, usd_out_after_fee, fee, realised })
    }

    /// Position fee on `size_delta` plus funding owed on `size`. The token value
    /// moves into the fee reserve of `collateral_asset`.
    pub(super) fn collect_margin_fees(
        &mut self,
        collateral_asset: AssetId,
        size_delta: Usd,
        size: Usd,
        entry_funding_rate: U256,
    ) -> Result<Usd, VaultError> {
        let fee_usd = self
            .get_position_fee(size_delta)?
            .checked_add(self.get_funding_fee(collateral_asset, size, entry_funding_rate)?)?;
        let fee_tokens = self.usd_to_token_min(collateral_asset, fee_usd)?;
        self.pool_mut(collateral_asset).collect_fee(fee_tokens)?;

        self.emit_event(EventPayload::CollectMarginFees(FeeEvent {
            asset: collateral_asset,
            fee_usd,
            fee_tokens,
        }));
        Ok(fee_usd)
    }

    // ---- queries ----

    pub fn get_position(
        &self,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        side: Side,
    ) -> Option<&Position> {
        self.ledger.position(&PositionKey::new(account, collateral_asset, index_asset, side))
    }

    pub fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.ledger.position(key)
    }

    /// Unrealised pnl of a position at the current mark.
    pub fn get_position_delta(&self, key: &PositionKey) -> Result<PositionDelta, VaultError> {
        let position = self.ledger.position(key).ok_or(VaultError::EmptyPosition)?;
        self.get_delta(key.index_asset, position.size, position.average_price, key.side, position.last_increased_time)
    }

    pub fn get_position_leverage(&self, key: &PositionKey) -> Result<U256, VaultError> {
        let position = self.ledger.position(key).ok_or(VaultError::EmptyPosition)?;
        if position.collateral.is_zero() {
            return Err(VaultError::InvalidPositionSize { size: position.size, collateral: position.collateral });
        }
        Ok(position.leverage_bps()?)
    }

    /// Pnl of `size` opened at `average_price`, marked at the exit price for `side`.
    pub fn get_delta(
        &self,
        index_asset: AssetId,
        size: Usd,
        average_price: Price,
        side: Side,
        last_increased_time: Timestamp,
    ) -> Result<PositionDelta, VaultError> {
        let mark = self.mark_price(index_asset, side)?;
        let min_profit_bps = if min_profit_window_open(last_increased_time, self.current_time, self.config.min_profit_time_secs) {
            self.assets.get(&index_asset).map_or(0, |a| a.min_profit_bps)
        } else {
            0
        };
        Ok(calculate_delta(side, size, average_price, mark, min_profit_bps)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn get_next_average_price(
        &self,
        index_asset: AssetId,
        size: Usd,
        average_price: Price,
        side: Side,
        next_price: Price,
        size_delta: Usd,
        last_increased_time: Timestamp,
    ) -> Result<Price, VaultError> {
        let delta = self.get_delta(index_asset, size, average_price, side, last_increased_time)?;
        Ok(next_average_price(side, size, next_price, size_delta, delta)?)
    }

    pub fn get_position_fee(&self, size_delta: Usd) -> Result<Usd, VaultError> {
        Ok(position_fee(size_delta, self.config.margin_fee_bps)?)
    }

    /// Aggregate pnl of all shorts on `index_asset`, seen from the traders' side.
    pub fn get_global_short_delta(&self, index_asset: AssetId) -> Result<PositionDelta, VaultError> {
        let Some(pool) = self.pool(index_asset) else {
            return Ok(PositionDelta::zero());
        };
        let Some(average) = pool.global_short_average_price else {
            return Ok(PositionDelta::zero());
        };
        let mark = self.get_max_price(index_asset)?;
        Ok(calculate_delta(Side::Short, pool.global_short_size, average, mark, 0)?)
    }

    /// Longs enter at the max price, shorts at the min.
    pub(super) fn entry_price(&self, index_asset: AssetId, side: Side) -> Result<Price, VaultError> {
        match side {
            Side::Long => self.get_max_price(index_asset),
            Side::Short => self.get_min_price(index_asset),
        }
    }

    /// Longs exit at the min price, shorts at the max.
    pub(super) fn mark_price(&self, index_asset: AssetId, side: Side) -> Result<Price, VaultError> {
        match side {
            Side::Long => self.get_min_price(index_asset),
            Side::Short => self.get_max_price(index_asset),
        }
    }
}

// size may never drop below collateral
fn validate_position(position: &Position) -> Result<(), VaultError> {
    if position.size.is_zero() {
        if !position.collateral.is_zero() {
            return Err(VaultError::InvalidPositionSize { size: position.size, collateral: position.collateral });
        }
        return Ok(());
    }
    if position.size < position.collateral {
        return Err(VaultError::InvalidPositionSize { size: position.size, collateral: position.collateral });
    }
    Ok(())
}

pub(super) fn snapshot(key: PositionKey, position: &Position) -> PositionSnapshotEvent {
    PositionSnapshotEvent {
        key,
        size: position.size,
        collateral: position.collateral,
        average_price: position.average_price,
        entry_funding_rate: position.entry_funding_rate,
        reserve_amount: position.reserve_amount,
        realised_pnl: position.realised_pnl,
    }
}

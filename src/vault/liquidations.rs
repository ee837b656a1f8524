//! Liquidation checks and execution.

use super::core::Vault;
use super::results::{LiquidationResult, VaultError};
use crate::events::{EventPayload, FeeEvent, LiquidatePositionEvent};
use crate::liquidation::{classify, LiquidationCheck, LiquidationInputs, LiquidationState};
use crate::position::{Position, PositionKey};
use crate::price_feed::PriceOracle;
use crate::types::{AccountId, AssetId, Side, Usd};
use primitive_types::U256;

impl<O: PriceOracle> Vault<O> {
    /// Liquidation state of an open position and the margin fees it owes.
    /// With `raise` set any liquidatable state comes back as its error.
    pub fn validate_liquidation(
        &self,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        side: Side,
        raise: bool,
    ) -> Result<(LiquidationState, Usd), VaultError> {
        let key = PositionKey::new(account, collateral_asset, index_asset, side);
        let position = match self.ledger.position(&key) {
            Some(position) if !position.is_empty() => position,
            _ => return Err(VaultError::EmptyPosition),
        };
        let check = self.check_liquidation(&key, position)?;
        if raise {
            check.ensure_safe()?;
        }
        Ok((check.state, check.margin_fees))
    }

    pub(super) fn check_liquidation(&self, key: &PositionKey, position: &Position) -> Result<LiquidationCheck, VaultError> {
        let delta = self.get_delta(
            key.index_asset,
            position.size,
            position.average_price,
            key.side,
            position.last_increased_time,
        )?;
        let funding = self.get_funding_fee(key.collateral_asset, position.size, position.entry_funding_rate)?;
        let margin_fees = funding.checked_add(self.get_position_fee(position.size)?)?;

        let inputs = LiquidationInputs {
            size: position.size,
            collateral: position.collateral,
            delta,
            margin_fees,
            liquidation_fee_usd: self.config.liquidation_fee_usd,
            max_leverage_bps: self.config.max_leverage_bps,
        };
        Ok(classify(&inputs)?)
    }

    /// Liquidate an unhealthy position. A position over max leverage but still
    /// solvent is closed normally and its owner keeps the remainder.
    pub fn liquidate_position(
        &mut self,
        caller: AccountId,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        side: Side,
        fee_receiver: AccountId,
    ) -> Result<LiquidationResult, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            if vault.config.in_private_liquidation_mode && !vault.liquidators.contains(&caller) {
                return Err(VaultError::InvalidLiquidator(caller));
            }
            vault.apply_liquidation(account, collateral_asset, index_asset, side, fee_receiver)
        })
    }

    fn apply_liquidation(
        &mut self,
        account: AccountId,
        collateral_asset: AssetId,
        index_asset: AssetId,
        side: Side,
        fee_receiver: AccountId,
    ) -> Result<LiquidationResult, VaultError> {
        // the stored position pins the asset pair; current asset configs do not gate exits
        self.update_cumulative_funding_rate(collateral_asset)?;

        let key = PositionKey::new(account, collateral_asset, index_asset, side);
        let position = match self.ledger.position(&key) {
            Some(position) if !position.is_empty() => position.clone(),
            _ => return Err(VaultError::EmptyPosition),
        };

        let check = self.check_liquidation(&key, &position)?;
        let mark_price = self.mark_price(index_asset, side)?;

        match check.state {
            LiquidationState::NotLiquidatable => Err(VaultError::PositionCannotBeLiquidated),
            LiquidationState::LiquidatableByMaxLeverage => {
                tracing::warn!(account = %account, side = ?side, "closing position above max leverage");
                self.apply_decrease(key, Usd::zero(), position.size, account)?;
                Ok(LiquidationResult {
                    account,
                    state: check.state,
                    mark_price,
                    margin_fees: check.margin_fees,
                    liquidation_fee_tokens: U256::zero(),
                })
            }
            LiquidationState::LiquidatableByLosses => {
                let margin_fees = check.margin_fees;
                let fee_tokens = self.usd_to_token_min(collateral_asset, margin_fees)?;
                self.pool_mut(collateral_asset).collect_fee(fee_tokens)?;
                self.emit_event(EventPayload::CollectMarginFees(FeeEvent {
                    asset: collateral_asset,
                    fee_usd: margin_fees,
                    fee_tokens,
                }));

                self.pool_mut(collateral_asset).decrease_reserved_amount(position.reserve_amount)?;

                match side {
                    Side::Long => {
                        let pool = self.pool_mut(collateral_asset);
                        pool.decrease_guaranteed_usd(position.size.checked_sub(position.collateral)?)?;
                        pool.decrease_pool_amount(fee_tokens)?;
                    }
                    Side::Short => {
                        // what is left of the collateral after fees goes to the pool
                        if margin_fees < position.collateral {
                            let remaining = position.collateral.checked_sub(margin_fees)?;
                            let tokens = self.usd_to_token_min(collateral_asset, remaining)?;
                            self.pool_mut(collateral_asset).increase_pool_amount(tokens)?;
                        }
                        self.pool_mut(index_asset).decrease_global_short(position.size);
                    }
                }

                self.ledger.remove_position(&key);
                self.emit_event(EventPayload::LiquidatePosition(LiquidatePositionEvent {
                    key,
                    state: check.state,
                    size: position.size,
                    collateral: position.collateral,
                    reserve_amount: position.reserve_amount,
                    realised_pnl: position.realised_pnl,
                    mark_price,
                    fee_receiver,
                }));

                let liquidation_fee_tokens = self.usd_to_token_min(collateral_asset, self.config.liquidation_fee_usd)?;
                self.pool_mut(collateral_asset).decrease_pool_amount(liquidation_fee_tokens)?;
                self.transfer_out(collateral_asset, liquidation_fee_tokens, fee_receiver)?;

                tracing::warn!(
                    account = %account,
                    side = ?side,
                    size = %position.size,
                    mark_price = %mark_price,
                    "position liquidated"
                );

                Ok(LiquidationResult {
                    account,
                    state: check.state,
                    mark_price,
                    margin_fees,
                    liquidation_fee_tokens,
                })
            }
        }
    }
}

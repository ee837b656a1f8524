//! Swaps, share token mint/redeem and pool funding.
//!
//! Inputs are pushed to the vault before the call and picked up as the
//! difference to the recorded balance.

use super::core::Vault;
use super::results::{SwapResult, VaultError};
use crate::events::{EventPayload, FeeEvent, PoolAmountEvent, SwapEvent, UsdgEvent, WithdrawFeesEvent};
use crate::math;
use crate::price_feed::PriceOracle;
use crate::types::{AccountId, AssetId, TokenAmount, BASIS_POINTS_DIVISOR, PRICE_PRECISION};
use primitive_types::U256;

impl<O: PriceOracle> Vault<O> {
    /// Swap the pending deposit of `asset_in` for `asset_out`.
    pub fn swap(&mut self, asset_in: AssetId, asset_out: AssetId, receiver: AccountId) -> Result<SwapResult, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            if !vault.config.is_swap_enabled {
                return Err(VaultError::SwapsDisabled);
            }
            let in_stable = vault.whitelisted(asset_in)?.is_stable;
            let out_stable = vault.whitelisted(asset_out)?.is_stable;
            if asset_in == asset_out {
                return Err(VaultError::InvalidPath);
            }

            vault.update_cumulative_funding_rate(asset_in)?;
            vault.update_cumulative_funding_rate(asset_out)?;

            let amount_in = vault.transfer_in(asset_in)?;
            if amount_in.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }

            let price_in = vault.get_min_price(asset_in)?;
            let price_out = vault.get_max_price(asset_out)?;
            let raw_out = math::mul_div(amount_in, price_in.value(), price_out.value())?;
            let amount_out = vault.adjust_for_decimals(raw_out, asset_in, asset_out)?;
            let usdg_amount = vault.usdg_value(asset_in, amount_in)?;

            let fee_bps = if in_stable && out_stable {
                vault.config.stable_swap_fee_bps
            } else {
                vault.config.swap_fee_bps
            };
            let (amount_out_after_fees, fee_amount) = vault.collect_swap_fees(asset_out, amount_out, fee_bps)?;

            vault.pool_mut(asset_in).increase_usdg_amount(usdg_amount)?;
            vault.pool_mut(asset_out).decrease_usdg_amount(usdg_amount);
            vault.pool_mut(asset_in).increase_pool_amount(amount_in)?;
            vault.pool_mut(asset_out).decrease_pool_amount(amount_out)?;

            vault.transfer_out(asset_out, amount_out_after_fees, receiver)?;

            tracing::info!(
                asset_in = %asset_in,
                asset_out = %asset_out,
                amount_in = %amount_in,
                amount_out = %amount_out_after_fees,
                "swap"
            );
            vault.emit_event(EventPayload::Swap(SwapEvent {
                receiver,
                asset_in,
                asset_out,
                amount_in,
                amount_out,
                amount_out_after_fees,
                fee_bps,
            }));

            Ok(SwapResult { amount_in, amount_out: amount_out_after_fees, fee_amount })
        })
    }

    /// Add liquidity: the pending deposit of `asset` mints share tokens to `receiver`.
    /// Returns the amount minted.
    pub fn buy_usdg(&mut self, asset: AssetId, receiver: AccountId) -> Result<TokenAmount, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            vault.whitelisted(asset)?;

            let token_amount = vault.transfer_in(asset)?;
            if token_amount.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }
            vault.update_cumulative_funding_rate(asset)?;

            let fee_bps = vault.config.mint_burn_fee_bps;
            let (amount_after_fees, _) = vault.collect_swap_fees(asset, token_amount, fee_bps)?;
            let mint_amount = vault.usdg_value(asset, amount_after_fees)?;
            if mint_amount.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }

            vault.pool_mut(asset).increase_usdg_amount(mint_amount)?;
            vault.pool_mut(asset).increase_pool_amount(amount_after_fees)?;
            vault.mint_shares(receiver, mint_amount)?;

            tracing::info!(asset = %asset, receiver = %receiver, minted = %mint_amount, "share tokens minted");
            vault.emit_event(EventPayload::BuyUsdg(UsdgEvent {
                account: receiver,
                asset,
                token_amount,
                usdg_amount: mint_amount,
                fee_bps,
            }));
            Ok(mint_amount)
        })
    }

    /// Remove liquidity: burns the pending share tokens and pays out `asset`.
    /// Returns the tokens sent to `receiver`.
    pub fn sell_usdg(&mut self, asset: AssetId, receiver: AccountId) -> Result<TokenAmount, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            let redemption_bps = vault.whitelisted(asset)?.redemption_bps;
            let share = vault.config.share_asset;

            let usdg_amount = vault.transfer_in(share)?;
            if usdg_amount.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }
            vault.update_cumulative_funding_rate(asset)?;

            let redemption_amount = vault.get_redemption_amount(asset, usdg_amount)?;
            if redemption_amount.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }
            let cap = vault.redemption_cap(asset, redemption_bps)?;
            if redemption_amount > cap {
                return Err(VaultError::RedemptionCapExceeded { requested: redemption_amount, cap });
            }

            vault.pool_mut(asset).decrease_usdg_amount(usdg_amount);
            vault.pool_mut(asset).decrease_pool_amount(redemption_amount)?;

            let vault_account = vault.account;
            vault.burn_shares(vault_account, usdg_amount)?;
            vault.sync_recorded_balance(share);

            let fee_bps = vault.config.mint_burn_fee_bps;
            let (amount_out, _) = vault.collect_swap_fees(asset, redemption_amount, fee_bps)?;
            if amount_out.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }
            vault.transfer_out(asset, amount_out, receiver)?;

            tracing::info!(asset = %asset, receiver = %receiver, burned = %usdg_amount, amount_out = %amount_out, "share tokens redeemed");
            vault.emit_event(EventPayload::SellUsdg(UsdgEvent {
                account: receiver,
                asset,
                token_amount: amount_out,
                usdg_amount,
                fee_bps,
            }));
            Ok(amount_out)
        })
    }

    /// Donate the pending deposit of `asset` to the pool without minting shares.
    pub fn direct_pool_deposit(&mut self, asset: AssetId) -> Result<TokenAmount, VaultError> {
        self.atomic(|vault| {
            vault.ensure_initialized()?;
            vault.whitelisted(asset)?;
            let amount = vault.transfer_in(asset)?;
            if amount.is_zero() {
                return Err(VaultError::InvalidAmountIn);
            }
            vault.pool_mut(asset).increase_pool_amount(amount)?;
            vault.emit_event(EventPayload::DirectPoolDeposit(PoolAmountEvent { asset, amount }));
            Ok(amount)
        })
    }

    /// Governance only. Sends the whole fee reserve of `asset` to `receiver`.
    pub fn withdraw_fees(&mut self, caller: AccountId, asset: AssetId, receiver: AccountId) -> Result<TokenAmount, VaultError> {
        self.ensure_gov(caller)?;
        self.atomic(|vault| {
            let amount = vault.fee_reserves(asset);
            if amount.is_zero() {
                return Ok(amount);
            }
            vault.pool_mut(asset).fee_reserves = U256::zero();
            vault.transfer_out(asset, amount, receiver)?;

            tracing::info!(asset = %asset, receiver = %receiver, amount = %amount, "fees withdrawn");
            vault.emit_event(EventPayload::WithdrawFees(WithdrawFeesEvent { asset, receiver, amount }));
            Ok(amount)
        })
    }

    /// Tokens of `asset` that `usdg_amount` share tokens redeem for, before fees.
    pub fn get_redemption_amount(&self, asset: AssetId, usdg_amount: TokenAmount) -> Result<TokenAmount, VaultError> {
        let price = self.get_max_price(asset)?;
        let raw = math::mul_div(usdg_amount, U256::from(PRICE_PRECISION), price.value())?;
        self.adjust_for_decimals(raw, self.config.share_asset, asset)
    }

    fn redemption_cap(&self, asset: AssetId, redemption_bps: u32) -> Result<TokenAmount, VaultError> {
        let available = self.pool(asset).map(|p| p.available_amount()).unwrap_or_default();
        Ok(math::mul_div(available, U256::from(redemption_bps), U256::from(BASIS_POINTS_DIVISOR))?)
    }

    // usd value of a token amount at the min price, in share token decimals
    fn usdg_value(&self, asset: AssetId, amount: TokenAmount) -> Result<TokenAmount, VaultError> {
        let price = self.get_min_price(asset)?;
        let raw = math::mul_div(amount, price.value(), U256::from(PRICE_PRECISION))?;
        self.adjust_for_decimals(raw, asset, self.config.share_asset)
    }

    // returns (after_fee, fee). the fee stays in the vault as fee reserve
    fn collect_swap_fees(&mut self, asset: AssetId, amount: TokenAmount, fee_bps: u32) -> Result<(TokenAmount, TokenAmount), VaultError> {
        let (after_fee, fee_amount) = math::split_bps_fee(amount, fee_bps)?;
        self.pool_mut(asset).collect_fee(fee_amount)?;
        let fee_usd = self.token_to_usd_min(asset, fee_amount)?;
        self.emit_event(EventPayload::CollectSwapFees(FeeEvent { asset, fee_usd, fee_tokens: fee_amount }));
        Ok((after_fee, fee_amount))
    }
}

//! Price lookups and usd/token conversions.
//!
//! Conversions always round against the trader: usd in uses the min price,
//! tokens out for a usd amount use the max price.

use super::core::Vault;
use super::results::VaultError;
use crate::math;
use crate::price_feed::PriceOracle;
use crate::types::{AssetId, Price, TokenAmount, Usd, USDG_DECIMALS};
use primitive_types::U256;

impl<O: PriceOracle> Vault<O> {
    pub fn get_max_price(&self, asset: AssetId) -> Result<Price, VaultError> {
        Ok(self.oracle.get_price(asset, true, true, false)?)
    }

    pub fn get_min_price(&self, asset: AssetId) -> Result<Price, VaultError> {
        Ok(self.oracle.get_price(asset, false, true, false)?)
    }

    /// Decimals of any asset that was ever configured. The share token always has 18.
    pub fn decimals(&self, asset: AssetId) -> Result<u32, VaultError> {
        if asset == self.config.share_asset {
            return Ok(USDG_DECIMALS);
        }
        self.asset_decimals.get(&asset).copied().ok_or(VaultError::AssetNotWhitelisted(asset))
    }

    pub fn token_to_usd_min(&self, asset: AssetId, amount: TokenAmount) -> Result<Usd, VaultError> {
        if amount.is_zero() {
            return Ok(Usd::zero());
        }
        let price = self.get_min_price(asset)?;
        let decimals = self.decimals(asset)?;
        let raw = math::mul_div(amount, price.value(), math::pow10(decimals))?;
        Ok(Usd::new(raw))
    }

    /// Most tokens `usd` can buy, priced at the min price.
    pub fn usd_to_token_max(&self, asset: AssetId, usd: Usd) -> Result<TokenAmount, VaultError> {
        if usd.is_zero() {
            return Ok(U256::zero());
        }
        let price = self.get_min_price(asset)?;
        self.usd_to_token(asset, usd, price)
    }

    /// Fewest tokens `usd` can buy, priced at the max price.
    pub fn usd_to_token_min(&self, asset: AssetId, usd: Usd) -> Result<TokenAmount, VaultError> {
        if usd.is_zero() {
            return Ok(U256::zero());
        }
        let price = self.get_max_price(asset)?;
        self.usd_to_token(asset, usd, price)
    }

    pub fn usd_to_token(&self, asset: AssetId, usd: Usd, price: Price) -> Result<TokenAmount, VaultError> {
        if usd.is_zero() {
            return Ok(U256::zero());
        }
        let decimals = self.decimals(asset)?;
        Ok(math::mul_div(usd.value(), math::pow10(decimals), price.value())?)
    }

    /// Rescale between two assets' native decimals.
    pub fn adjust_for_decimals(&self, amount: TokenAmount, from: AssetId, to: AssetId) -> Result<TokenAmount, VaultError> {
        let from_decimals = self.decimals(from)?;
        let to_decimals = self.decimals(to)?;
        Ok(math::adjust_for_decimals(amount, from_decimals, to_decimals)?)
    }
}

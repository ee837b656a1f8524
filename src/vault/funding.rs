//! Funding accrual on collateral pools.

use super::core::Vault;
use super::results::VaultError;
use crate::events::{EventPayload, FundingRateEvent};
use crate::funding::{accrue, funding_fee, next_funding_rate};
use crate::price_feed::PriceOracle;
use crate::types::{AssetId, Usd};
use primitive_types::U256;

impl<O: PriceOracle> Vault<O> {
    /// Accrue whole elapsed intervals on the pool of `collateral_asset`.
    pub fn update_cumulative_funding_rate(&mut self, collateral_asset: AssetId) -> Result<(), VaultError> {
        let now = self.current_time;
        let interval = self.config.funding_interval_secs;
        let factor = self.funding_rate_factor(collateral_asset);

        let update = accrue(self.pool_mut(collateral_asset), now, interval, factor)?;
        if let Some(update) = update {
            tracing::debug!(
                asset = %collateral_asset,
                intervals = update.intervals,
                cumulative = %update.cumulative_funding_rate,
                "funding accrued"
            );
            self.emit_event(EventPayload::UpdateFundingRate(FundingRateEvent {
                asset: collateral_asset,
                cumulative_funding_rate: update.cumulative_funding_rate,
            }));
        }
        Ok(())
    }

    /// Rate that would be added if funding were updated now.
    pub fn get_next_funding_rate(&self, collateral_asset: AssetId) -> Result<U256, VaultError> {
        let Some(pool) = self.pool(collateral_asset) else {
            return Ok(U256::zero());
        };
        let Some(last) = pool.last_funding_time else {
            return Ok(U256::zero());
        };
        Ok(next_funding_rate(
            pool,
            last,
            self.current_time,
            self.config.funding_interval_secs,
            self.funding_rate_factor(collateral_asset),
        )?)
    }

    pub fn get_funding_fee(&self, collateral_asset: AssetId, size: Usd, entry_funding_rate: U256) -> Result<Usd, VaultError> {
        let cumulative = self.cumulative_funding_rate(collateral_asset);
        Ok(funding_fee(size, entry_funding_rate, cumulative)?)
    }

    fn funding_rate_factor(&self, asset: AssetId) -> u32 {
        if self.is_stable(asset) {
            self.config.stable_funding_rate_factor
        } else {
            self.config.funding_rate_factor
        }
    }
}

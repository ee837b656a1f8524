// 9.3 pool.rs: per-asset pool ledger. one shared pool backs every position.
// pool_amount excludes fee_reserves. reserved_amount is the part locked for open
// positions and may never exceed pool_amount.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::math;
use crate::types::{AssetId, Price, Timestamp, TokenAmount, Usd};
use crate::vault::VaultError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub asset: AssetId,
    pub pool_amount: TokenAmount,
    pub reserved_amount: TokenAmount,
    pub fee_reserves: TokenAmount,
    // sum of (size - collateral) over longs on this asset
    pub guaranteed_usd: Usd,
    // share token debt attributed to this asset
    pub usdg_amount: TokenAmount,
    pub cumulative_funding_rate: U256,
    pub last_funding_time: Option<Timestamp>,
    pub global_short_size: Usd,
    pub global_short_average_price: Option<Price>,
}

impl PoolState {
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            pool_amount: U256::zero(),
            reserved_amount: U256::zero(),
            fee_reserves: U256::zero(),
            guaranteed_usd: Usd::zero(),
            usdg_amount: U256::zero(),
            cumulative_funding_rate: U256::zero(),
            last_funding_time: None,
            global_short_size: Usd::zero(),
            global_short_average_price: None,
        }
    }

    /// Tokens not locked by open positions.
    pub fn available_amount(&self) -> TokenAmount {
        self.pool_amount.saturating_sub(self.reserved_amount)
    }

    /// Reserved share of the pool in bps, 0 for an empty pool.
    pub fn utilization_bps(&self) -> U256 {
        if self.pool_amount.is_zero() {
            return U256::zero();
        }
        self.reserved_amount * U256::from(crate::types::BASIS_POINTS_DIVISOR) / self.pool_amount
    }

    pub fn increase_pool_amount(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.pool_amount = math::add(self.pool_amount, amount)?;
        Ok(())
    }

    pub fn decrease_pool_amount(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.pool_amount = self.pool_amount.checked_sub(amount).ok_or(VaultError::PoolAmountExceeded {
            asset: self.asset,
            pool: self.pool_amount,
            requested: amount,
        })?;
        self.ensure_reserve_covered()
    }

    pub fn increase_reserved_amount(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.reserved_amount = math::add(self.reserved_amount, amount)?;
        self.ensure_reserve_covered()
    }

    pub fn decrease_reserved_amount(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.reserved_amount = self.reserved_amount.checked_sub(amount).ok_or(VaultError::InsufficientReserve {
            asset: self.asset,
            reserved: self.reserved_amount,
            requested: amount,
        })?;
        Ok(())
    }

    pub fn increase_guaranteed_usd(&mut self, amount: Usd) -> Result<(), VaultError> {
        self.guaranteed_usd = self.guaranteed_usd.checked_add(amount)?;
        Ok(())
    }

    pub fn decrease_guaranteed_usd(&mut self, amount: Usd) -> Result<(), VaultError> {
        self.guaranteed_usd = self.guaranteed_usd.checked_sub(amount)?;
        Ok(())
    }

    pub fn collect_fee(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.fee_reserves = math::add(self.fee_reserves, amount)?;
        Ok(())
    }

    pub fn increase_usdg_amount(&mut self, amount: TokenAmount) -> Result<(), VaultError> {
        self.usdg_amount = math::add(self.usdg_amount, amount)?;
        Ok(())
    }

    // debt can be repaid past zero when prices moved, clamp instead of failing
    pub fn decrease_usdg_amount(&mut self, amount: TokenAmount) {
        self.usdg_amount = self.usdg_amount.saturating_sub(amount);
    }

    /// Fold a new short into the global short average price.
    pub fn increase_global_short(&mut self, mark_price: Price, size_delta: Usd) -> Result<(), VaultError> {
        let next_average = match self.global_short_average_price {
            Some(average) if !self.global_short_size.is_zero() => {
                let size = self.global_short_size;
                let price_delta = math::abs_diff(average.value(), mark_price.value());
                let delta = math::mul_div(size.value(), price_delta, average.value())?;
                let has_profit = average > mark_price;
                let next_size = math::add(size.value(), size_delta.value())?;
                let divisor = if has_profit { math::sub(next_size, delta)? } else { math::add(next_size, delta)? };
                let raw = math::mul_div(mark_price.value(), next_size, divisor)?;
                Price::new(raw).unwrap_or(mark_price)
            }
            _ => mark_price,
        };
        self.global_short_size = self.global_short_size.checked_add(size_delta)?;
        self.global_short_average_price = Some(next_average);
        Ok(())
    }

    pub fn decrease_global_short(&mut self, size_delta: Usd) {
        self.global_short_size = self.global_short_size.saturating_sub(size_delta);
        if self.global_short_size.is_zero() {
            self.global_short_average_price = None;
        }
    }

    fn ensure_reserve_covered(&self) -> Result<(), VaultError> {
        if self.reserved_amount > self.pool_amount {
            return Err(VaultError::InsufficientPoolLiquidity {
                asset: self.asset,
                pool: self.pool_amount,
                reserved: self.reserved_amount,
            });
        }
        Ok(())
    }
}

/// All pools, keyed by asset. Pools are created on first touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolLedger {
    pools: HashMap<AssetId, PoolState>,
}

impl PoolLedger {
    pub fn get(&self, asset: AssetId) -> Option<&PoolState> {
        self.pools.get(&asset)
    }

    pub fn get_mut(&mut self, asset: AssetId) -> &mut PoolState {
        self.pools.entry(asset).or_insert_with(|| PoolState::new(asset))
    }

    pub(crate) fn restore(&mut self, asset: AssetId, prior: Option<PoolState>) {
        match prior {
            Some(state) => self.pools.insert(asset, state),
            None => self.pools.remove(&asset),
        };
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &PoolState)> {
        self.pools.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: AssetId = AssetId(2);

    fn pool(amount: u64) -> PoolState {
        let mut pool = PoolState::new(BTC);
        pool.increase_pool_amount(U256::from(amount)).unwrap();
        pool
    }

    #[test]
    fn test_reserve_cannot_exceed_pool() {
        let mut pool = pool(1000);
        pool.increase_reserved_amount(U256::from(1000)).unwrap();

        let result = pool.increase_reserved_amount(U256::from(1));
        assert!(matches!(result, Err(VaultError::InsufficientPoolLiquidity { .. })));
    }

    #[test]
    fn test_decrease_pool_checks_reserve() {
        let mut pool = pool(1000);
        pool.increase_reserved_amount(U256::from(600)).unwrap();

        assert!(matches!(
            pool.decrease_pool_amount(U256::from(401)),
            Err(VaultError::InsufficientPoolLiquidity { .. })
        ));
        assert!(matches!(
            pool.decrease_pool_amount(U256::from(2000)),
            Err(VaultError::PoolAmountExceeded { .. })
        ));
        pool.decrease_pool_amount(U256::from(400)).unwrap();
        assert_eq!(pool.available_amount(), U256::zero());
    }

    #[test]
    fn test_release_more_than_reserved() {
        let mut pool = pool(1000);
        pool.increase_reserved_amount(U256::from(10)).unwrap();
        assert!(matches!(
            pool.decrease_reserved_amount(U256::from(11)),
            Err(VaultError::InsufficientReserve { .. })
        ));
    }

    #[test]
    fn test_utilization() {
        let mut pool = pool(1000);
        pool.increase_reserved_amount(U256::from(250)).unwrap();
        assert_eq!(pool.utilization_bps(), U256::from(2500));
        assert_eq!(PoolState::new(BTC).utilization_bps(), U256::zero());
    }

    #[test]
    fn test_global_short_average() {
        let mut pool = PoolState::new(BTC);
        let p40 = Price::from_units(40000).unwrap();
        let p50 = Price::from_units(50000).unwrap();

        pool.increase_global_short(p40, Usd::from_units(100)).unwrap();
        assert_eq!(pool.global_short_average_price, Some(p40));

        // short of 100 at 40k is down 25 at 50k. next = 50000 * 200 / 225
        pool.increase_global_short(p50, Usd::from_units(100)).unwrap();
        let expected = Price::from_units(50000).unwrap().value() * U256::from(200) / U256::from(225);
        assert_eq!(pool.global_short_average_price.unwrap().value(), expected);

        pool.decrease_global_short(Usd::from_units(200));
        assert!(pool.global_short_average_price.is_none());
    }
}

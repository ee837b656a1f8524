// 4.0: open position tracking. pnl delta = size * |mark - average| / average.
// 4.1 has the average price rule for increases at the bottom.
// sizes and collateral are usd, the reserve is in collateral tokens.

use crate::math::{self, MathError};
use crate::types::{AccountId, AssetId, Price, Side, SignedUsd, Timestamp, TokenAmount, Usd, BASIS_POINTS_DIVISOR};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// One position per (account, collateral, index, side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub account: AccountId,
    pub collateral_asset: AssetId,
    pub index_asset: AssetId,
    pub side: Side,
}

impl PositionKey {
    pub fn new(account: AccountId, collateral_asset: AssetId, index_asset: AssetId, side: Side) -> Self {
        Self { account, collateral_asset, index_asset, side }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub size: Usd,
    pub collateral: Usd,
    pub average_price: Price,
    pub entry_funding_rate: U256,
    pub reserve_amount: TokenAmount,
    pub realised_pnl: SignedUsd,
    pub last_increased_time: Timestamp,
}

impl Position {
    /// A record that is about to receive its first increase.
    pub fn opening(average_price: Price, timestamp: Timestamp) -> Self {
        Self {
            size: Usd::zero(),
            collateral: Usd::zero(),
            average_price,
            entry_funding_rate: U256::zero(),
            reserve_amount: U256::zero(),
            realised_pnl: SignedUsd::zero(),
            last_increased_time: timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    // 4.2: size / collateral in bps. 90817 is ~9.08x
    pub fn leverage_bps(&self) -> Result<U256, MathError> {
        math::mul_div(self.size.value(), U256::from(BASIS_POINTS_DIVISOR), self.collateral.value())
    }

    /// Share of the reserve released when `size_delta` of the size is closed.
    pub fn reserve_for(&self, size_delta: Usd) -> Result<TokenAmount, MathError> {
        math::mul_div(self.reserve_amount, size_delta.value(), self.size.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDelta {
    pub has_profit: bool,
    pub delta: Usd,
}

impl PositionDelta {
    pub fn zero() -> Self {
        Self { has_profit: false, delta: Usd::zero() }
    }

    /// Portion of the delta realised when `size_delta` of `size` is closed.
    pub fn pro_rata(&self, size_delta: Usd, size: Usd) -> Result<Usd, MathError> {
        self.delta.mul_div(size_delta.value(), size.value())
    }
}

// 4.3: the pnl formula. longs gain above average, shorts below.
// min_profit_bps suppresses tiny profits so a fast round trip cannot farm price noise.
pub fn calculate_delta(
    side: Side,
    size: Usd,
    average_price: Price,
    mark_price: Price,
    min_profit_bps: u32,
) -> Result<PositionDelta, MathError> {
    let price_delta = math::abs_diff(average_price.value(), mark_price.value());
    let mut delta = size.mul_div(price_delta, average_price.value())?;

    let has_profit = match side {
        Side::Long => mark_price > average_price,
        Side::Short => average_price > mark_price,
    };

    if has_profit && min_profit_bps > 0 {
        let scaled_delta = math::mul(delta.value(), U256::from(BASIS_POINTS_DIVISOR))?;
        let threshold = math::mul(size.value(), U256::from(min_profit_bps))?;
        if scaled_delta <= threshold {
            delta = Usd::zero();
        }
    }

    Ok(PositionDelta { has_profit, delta })
}

/// True while the min profit rule applies. A zero window means it always applies.
pub fn min_profit_window_open(last_increased_time: Timestamp, now: Timestamp, min_profit_time_secs: u64) -> bool {
    min_profit_time_secs == 0 || now <= last_increased_time.plus_secs(min_profit_time_secs)
}

// 4.4: next average after adding size_delta at next_price. keeps the open delta
// intact: next_price * next_size / (next_size +- delta)
pub fn next_average_price(
    side: Side,
    size: Usd,
    next_price: Price,
    size_delta: Usd,
    delta: PositionDelta,
) -> Result<Price, MathError> {
    let next_size = size.checked_add(size_delta)?;
    let grows_divisor = match side {
        Side::Long => delta.has_profit,
        Side::Short => !delta.has_profit,
    };
    let divisor = if grows_divisor {
        next_size.checked_add(delta.delta)?
    } else {
        next_size.checked_sub(delta.delta)?
    };
    let raw = math::mul_div(next_price.value(), next_size.value(), divisor.value())?;
    Price::new(raw).ok_or(MathError::DivisionByZero)
}

/// Open/close fee: `size_delta - size_delta * (10000 - bps) / 10000`.
pub fn position_fee(size_delta: Usd, margin_fee_bps: u32) -> Result<Usd, MathError> {
    if size_delta.is_zero() {
        return Ok(Usd::zero());
    }
    let (_, fee) = math::split_bps_fee(size_delta.value(), margin_fee_bps)?;
    Ok(Usd::new(fee))
}

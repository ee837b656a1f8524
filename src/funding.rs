// 5.0: funding. borrowers of pool liquidity pay a fee that grows with utilization.
// each collateral pool keeps a cumulative rate, positions remember the rate at entry
// and owe size * (cumulative - entry) / 1_000_000.
// 5.1 has the accrual step, 5.2 the per-position fee.

use crate::math::{self, MathError};
use crate::pool::PoolState;
use crate::types::{Timestamp, Usd, FUNDING_RATE_PRECISION};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingUpdate {
    pub intervals: u64,
    pub rate_increment: U256,
    pub cumulative_funding_rate: U256,
    pub last_funding_time: Timestamp,
}

/// Start of the funding interval that contains `now`.
pub fn interval_boundary(now: Timestamp, interval_secs: u64) -> Timestamp {
    if interval_secs == 0 {
        return now;
    }
    Timestamp::from_secs(now.as_secs() / interval_secs * interval_secs)
}

// factor * reserved * whole intervals / pool. zero until a full interval has passed
pub fn next_funding_rate(
    pool: &PoolState,
    last_funding_time: Timestamp,
    now: Timestamp,
    interval_secs: u64,
    rate_factor: u32,
) -> Result<U256, MathError> {
    if interval_secs == 0 || last_funding_time.plus_secs(interval_secs) > now {
        return Ok(U256::zero());
    }
    if pool.pool_amount.is_zero() {
        return Ok(U256::zero());
    }
    let intervals = now.secs_since(last_funding_time) / interval_secs;
    let numerator = math::mul(U256::from(rate_factor), pool.reserved_amount)?;
    math::mul_div(numerator, U256::from(intervals), pool.pool_amount)
}

// 5.1: first touch only snaps the clock. returns None when nothing accrued
pub fn accrue(
    pool: &mut PoolState,
    now: Timestamp,
    interval_secs: u64,
    rate_factor: u32,
) -> Result<Option<FundingUpdate>, MathError> {
    let Some(last) = pool.last_funding_time else {
        pool.last_funding_time = Some(interval_boundary(now, interval_secs));
        return Ok(None);
    };

    if last.plus_secs(interval_secs) > now {
        return Ok(None);
    }

    let rate_increment = next_funding_rate(pool, last, now, interval_secs, rate_factor)?;
    pool.cumulative_funding_rate = math::add(pool.cumulative_funding_rate, rate_increment)?;
    let boundary = interval_boundary(now, interval_secs);
    pool.last_funding_time = Some(boundary);

    Ok(Some(FundingUpdate {
        intervals: now.secs_since(last) / interval_secs.max(1),
        rate_increment,
        cumulative_funding_rate: pool.cumulative_funding_rate,
        last_funding_time: boundary,
    }))
}

// 5.2: what a position owes since it last reset its entry rate
pub fn funding_fee(size: Usd, entry_funding_rate: U256, cumulative_funding_rate: U256) -> Result<Usd, MathError> {
    if size.is_zero() {
        return Ok(Usd::zero());
    }
    let rate = cumulative_funding_rate.saturating_sub(entry_funding_rate);
    if rate.is_zero() {
        return Ok(Usd::zero());
    }
    size.mul_div(rate, U256::from(FUNDING_RATE_PRECISION))
}

//! Liquidation classification.
//!
//! A position is liquidatable by losses when its collateral, after realising the
//! current loss, cannot cover the accrued margin fees plus the flat liquidation fee.
//! It is liquidatable by leverage when it still covers those but sits above the
//! max leverage. The same check guards every increase and partial decrease, where
//! any liquidatable outcome is a hard error instead.

use crate::math::{self, MathError};
use crate::position::PositionDelta;
use crate::types::{Usd, BASIS_POINTS_DIVISOR};
use crate::vault::VaultError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationState {
    NotLiquidatable,
    LiquidatableByLosses,
    LiquidatableByMaxLeverage,
}

/// Which test failed, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationReason {
    LossesExceedCollateral,
    FeesExceedCollateral,
    LiquidationFeesExceedCollateral,
    MaxLeverageExceeded,
}

impl LiquidationReason {
    pub fn state(&self) -> LiquidationState {
        match self {
            LiquidationReason::MaxLeverageExceeded => LiquidationState::LiquidatableByMaxLeverage,
            _ => LiquidationState::LiquidatableByLosses,
        }
    }

    pub fn into_error(self) -> VaultError {
        match self {
            LiquidationReason::LossesExceedCollateral => VaultError::LossesExceedCollateral,
            LiquidationReason::FeesExceedCollateral => VaultError::FeesExceedCollateral,
            LiquidationReason::LiquidationFeesExceedCollateral => VaultError::LiquidationFeesExceedCollateral,
            LiquidationReason::MaxLeverageExceeded => VaultError::MaxLeverageExceeded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCheck {
    pub state: LiquidationState,
    pub reason: Option<LiquidationReason>,
    /// Fees collectable from the position. Capped at the remaining collateral
    /// when that is all there is.
    pub margin_fees: Usd,
}

impl LiquidationCheck {
    fn safe(margin_fees: Usd) -> Self {
        Self { state: LiquidationState::NotLiquidatable, reason: None, margin_fees }
    }

    fn flagged(reason: LiquidationReason, margin_fees: Usd) -> Self {
        Self { state: reason.state(), reason: Some(reason), margin_fees }
    }

    /// Raising mode: any liquidatable outcome becomes its error.
    pub fn ensure_safe(&self) -> Result<(), VaultError> {
        match self.reason {
            Some(reason) => Err(reason.into_error()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidationInputs {
    pub size: Usd,
    pub collateral: Usd,
    pub delta: PositionDelta,
    // funding fee plus the close fee on the full size
    pub margin_fees: Usd,
    pub liquidation_fee_usd: Usd,
    pub max_leverage_bps: u32,
}

pub fn classify(inputs: &LiquidationInputs) -> Result<LiquidationCheck, MathError> {
    let LiquidationInputs { size, collateral, delta, margin_fees, liquidation_fee_usd, max_leverage_bps } = *inputs;

    if !delta.has_profit && collateral < delta.delta {
        return Ok(LiquidationCheck::flagged(LiquidationReason::LossesExceedCollateral, margin_fees));
    }

    let remaining = if delta.has_profit { collateral } else { collateral.checked_sub(delta.delta)? };

    if remaining < margin_fees {
        return Ok(LiquidationCheck::flagged(LiquidationReason::FeesExceedCollateral, remaining));
    }

    if remaining < margin_fees.checked_add(liquidation_fee_usd)? {
        return Ok(LiquidationCheck::flagged(LiquidationReason::LiquidationFeesExceedCollateral, margin_fees));
    }

    let levered = math::mul(remaining.value(), U256::from(max_leverage_bps))?;
    let exposure = math::mul(size.value(), U256::from(BASIS_POINTS_DIVISOR))?;
    if levered < exposure {
        return Ok(LiquidationCheck::flagged(LiquidationReason::MaxLeverageExceeded, margin_fees));
    }

    Ok(LiquidationCheck::safe(margin_fees))
}

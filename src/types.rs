// 1.0: all the primitives live here. ids, sides, usd amounts, prices, timestamps.
// each is a newtype so the compiler catches usd/price/token mixups.
// usd and prices are scaled integers (10^30), token amounts are raw U256 in native decimals.

use crate::math::{self, MathError};
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PRICE_DECIMALS: u32 = 30;
pub const PRICE_PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000_000;
pub const BASIS_POINTS_DIVISOR: u32 = 10_000;
pub const FUNDING_RATE_PRECISION: u32 = 1_000_000;
pub const USDG_DECIMALS: u32 = 18;

/// Raw token units in the asset's native decimals.
pub type TokenAmount = U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

// 1.1: usd amount scaled by 10^30. size, collateral, fees, pnl all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Usd(U256);

impl Usd {
    pub fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Whole dollars, e.g. `Usd::from_units(90)` is 90 USD.
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units) * U256::from(PRICE_PRECISION))
    }

    /// Exact conversion from a human decimal. Negative values are rejected.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        decimal_to_scaled(value).map(Self)
    }

    pub fn to_decimal(&self) -> Decimal {
        scaled_to_decimal(self.0)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Usd) -> Result<Usd, MathError> {
        math::add(self.0, other.0).map(Usd)
    }

    pub fn checked_sub(self, other: Usd) -> Result<Usd, MathError> {
        math::sub(self.0, other.0).map(Usd)
    }

    pub fn saturating_sub(self, other: Usd) -> Usd {
        Usd(self.0.saturating_sub(other.0))
    }

    /// `self * numerator / denominator`, rounded down.
    pub fn mul_div(self, numerator: U256, denominator: U256) -> Result<Usd, MathError> {
        math::mul_div(self.0, numerator, denominator).map(Usd)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal())
    }
}

// 1.2: usd per whole unit of an asset, scaled by 10^30. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(U256);

impl Price {
    #[must_use]
    pub fn new(raw: U256) -> Option<Self> {
        if raw.is_zero() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn from_units(units: u64) -> Option<Self> {
        Self::new(U256::from(units) * U256::from(PRICE_PRECISION))
    }

    pub fn from_decimal(value: Decimal) -> Option<Self> {
        decimal_to_scaled(value).and_then(Self::new)
    }

    pub fn one_usd() -> Self {
        Self(U256::from(PRICE_PRECISION))
    }

    pub fn to_decimal(&self) -> Decimal {
        scaled_to_decimal(self.0)
    }

    pub fn value(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal())
    }
}

// 1.3: signed usd for realised pnl. zero is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedUsd {
    pub is_negative: bool,
    pub magnitude: Usd,
}

impl SignedUsd {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn profit(magnitude: Usd) -> Self {
        Self { is_negative: false, magnitude }
    }

    pub fn loss(magnitude: Usd) -> Self {
        Self { is_negative: !magnitude.is_zero(), magnitude }
    }

    pub fn add_profit(self, amount: Usd) -> Result<Self, MathError> {
        self.combine(Self::profit(amount))
    }

    pub fn add_loss(self, amount: Usd) -> Result<Self, MathError> {
        self.combine(Self::loss(amount))
    }

    fn combine(self, other: Self) -> Result<Self, MathError> {
        if self.is_negative == other.is_negative {
            let magnitude = self.magnitude.checked_add(other.magnitude)?;
            return Ok(Self { is_negative: self.is_negative && !magnitude.is_zero(), magnitude });
        }
        if self.magnitude >= other.magnitude {
            let magnitude = self.magnitude.checked_sub(other.magnitude)?;
            Ok(Self { is_negative: self.is_negative && !magnitude.is_zero(), magnitude })
        } else {
            let magnitude = other.magnitude.checked_sub(self.magnitude)?;
            Ok(Self { is_negative: other.is_negative, magnitude })
        }
    }

    pub fn to_decimal(&self) -> Decimal {
        let value = self.magnitude.to_decimal();
        if self.is_negative {
            -value
        } else {
            value
        }
    }
}

impl fmt::Display for SignedUsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

// 1.4: second-resolution timestamp. funding intervals snap to multiples of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.0 as i64, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}s", self.0),
        }
    }
}

/// `amount` whole units expressed in `decimals` native decimals.
pub fn expand_decimals(amount: u64, decimals: u32) -> TokenAmount {
    U256::from(amount) * math::pow10(decimals)
}

fn decimal_to_scaled(value: Decimal) -> Option<U256> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scale = value.scale();
    if scale > PRICE_DECIMALS {
        return None;
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    mantissa.checked_mul(math::pow10(PRICE_DECIMALS - scale))
}

// keeps 12 fractional digits, enough for display and human-unit assertions
fn scaled_to_decimal(raw: U256) -> Decimal {
    let precision = U256::from(PRICE_PRECISION);
    let whole = raw / precision;
    let fraction = (raw % precision) / math::pow10(PRICE_DECIMALS - 12);
    if whole > U256::from(10_000_000_000_000_000u128) {
        return Decimal::MAX;
    }
    let combined = whole.low_u128() * 1_000_000_000_000 + fraction.low_u128();
    Decimal::try_from_i128_with_scale(combined as i128, 12)
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}

// 1.5 math.rs: checked integer arithmetic over U256. nothing in the vault uses
// floating point or wrapping ops. every helper returns MathError instead of panicking.

use primitive_types::U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
}

pub fn add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

pub fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub fn div(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    Ok(a / b)
}

/// `a * b / c`, rounded down. The intermediate product must fit in 256 bits.
pub fn mul_div(a: U256, b: U256, c: U256) -> Result<U256, MathError> {
    div(mul(a, b)?, c)
}

pub fn pow10(exp: u32) -> U256 {
    U256::exp10(exp as usize)
}

/// Rescale a raw amount between two decimal precisions, rounding down.
pub fn adjust_for_decimals(amount: U256, from_decimals: u32, to_decimals: u32) -> Result<U256, MathError> {
    mul_div(amount, pow10(to_decimals), pow10(from_decimals))
}

/// Splits `amount` into (after_fee, fee) for a basis-point fee.
/// The fee is what is left after rounding the kept part down, so it rounds up.
pub fn split_bps_fee(amount: U256, fee_bps: u32) -> Result<(U256, U256), MathError> {
    let divisor = U256::from(crate::types::BASIS_POINTS_DIVISOR);
    let keep_bps = sub(divisor, U256::from(fee_bps))?;
    let after_fee = mul_div(amount, keep_bps, divisor)?;
    let fee = sub(amount, after_fee)?;
    Ok((after_fee, fee))
}

pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

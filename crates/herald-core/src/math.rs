//! Fixed-point helpers built on top of u128.
//!
//! Ratios are scaled by [`ADJUST_FOR_FLOAT`] before the integer division so
//! that fractional shares survive truncation for typical magnitudes.

use crate::error::MathError;
use crate::types::Amount;

/// Scaling factor applied to every ratio (1e7 precision).
pub const ADJUST_FOR_FLOAT: u128 = 10_000_000;

/// Compute `numerator * ADJUST_FOR_FLOAT / denominator` with overflow checks.
pub fn scaled_ratio(numerator: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::ZeroDenominator);
    }
    numerator
        .checked_mul(ADJUST_FOR_FLOAT)
        .map(|scaled| scaled / denominator)
        .ok_or(MathError::Overflow)
}

/// Weight of a channel relative to the minimum contribution.
///
/// A channel staking exactly `min_contribution` weighs `ADJUST_FOR_FLOAT`.
pub fn channel_weight(contribution: Amount, min_contribution: Amount) -> Result<u128, MathError> {
    scaled_ratio(contribution, min_contribution)
}

/// Multiply three factors, failing on overflow.
pub(crate) fn checked_mul3(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    a.checked_mul(b)
        .and_then(|ab| ab.checked_mul(c))
        .ok_or(MathError::Overflow)
}

//! Error types for Herald Core.

use thiserror::Error;

use crate::types::Height;

/// Arithmetic failures in fixed-point and accumulator math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("ratio denominator evaluated to zero")]
    ZeroDenominator,

    #[error("height {at} precedes last update {last_update}")]
    HeightRegression { last_update: Height, at: Height },
}

/// Errors parsing an address or public key from text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

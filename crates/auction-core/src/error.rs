//! Error types for auction-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    #[error("Negative amount cannot be encoded: {0}")]
    NegativeAmount(rust_decimal::Decimal),

    #[error("Unsupported decimal exponent: {0}")]
    UnsupportedDecimals(u32),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

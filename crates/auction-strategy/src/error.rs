//! Reasons an auction is not bid on.
//!
//! All of these are non-fatal: the auction is skipped and reconsidered on the
//! next block.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Market {0} is not in the allow-list")]
    MarketNotAllowed(String),

    #[error("Auction is finished")]
    Finished,

    #[error("Market {0} is not known to the exchange")]
    UnknownMarket(String),

    #[error("No free {0} balance")]
    ZeroBalance(String),

    #[error("Order value ${value_usd} is not above the ${min_usd} minimum")]
    NotionalTooSmall { value_usd: Decimal, min_usd: Decimal },

    #[error("Order book of {market} is {remaining} short of the requested size")]
    DepthNotEnough { market: String, remaining: Decimal },

    #[error("Expected receive {receive} does not exceed threshold {threshold}")]
    NotProfitable { receive: Decimal, threshold: Decimal },
}

impl Rejection {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MarketNotAllowed(_) => "market_not_allowed",
            Self::Finished => "finished",
            Self::UnknownMarket(_) => "unknown_market",
            Self::ZeroBalance(_) => "zero_balance",
            Self::NotionalTooSmall { .. } => "notional_too_small",
            Self::DepthNotEnough { .. } => "depth_not_enough",
            Self::NotProfitable { .. } => "not_profitable",
        }
    }
}

pub type StrategyResult<T> = Result<T, Rejection>;

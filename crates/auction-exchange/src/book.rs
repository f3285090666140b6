//! Order book snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Depth requested from the order book endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookLevel {
    /// Best bid and ask only.
    Top,
    /// Aggregated depth by price.
    Aggregated,
}

impl BookLevel {
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Top => "1",
            Self::Aggregated => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// Bids best-first (descending), asks best-first (ascending).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub market_id: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Midpoint of the best bid and ask; `None` unless both sides are present.
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some((bid + ask) / Decimal::TWO)
    }

    /// Copy limited to the top of book.
    pub fn top(&self) -> Self {
        Self {
            market_id: self.market_id.clone(),
            bids: self.bids.iter().take(1).copied().collect(),
            asks: self.asks.iter().take(1).copied().collect(),
        }
    }
}

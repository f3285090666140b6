//! Domain entities shared by the chain, strategy and execution crates.

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Asset / Market
// =============================================================================

/// A token traded on the exchange and held on the auction contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub address: Address,
    /// Decimal exponent of the raw on-chain representation.
    pub decimals: u32,
}

/// One traded pair, e.g. `ETH-DAI` (base `ETH`, quote `DAI`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub base: Asset,
    pub quote: Asset,
    /// Maximum significant digits in an order price.
    pub price_precision: u32,
    /// Maximum fractional digits in an order price.
    pub price_decimals: u32,
    /// Maximum fractional digits in an order amount.
    pub amount_decimals: u32,
    /// Minimum order notional, in quote units.
    pub min_order_size: Decimal,
}

impl Market {
    /// Whether `symbol` is this market's base asset.
    #[inline]
    pub fn is_base(&self, symbol: &str) -> bool {
        self.base.symbol == symbol
    }

    /// Whether `symbol` is one side of this market.
    #[inline]
    pub fn contains(&self, symbol: &str) -> bool {
        self.base.symbol == symbol || self.quote.symbol == symbol
    }
}

// =============================================================================
// Auction
// =============================================================================

/// Snapshot of one liquidation auction, decoded fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: u32,
    pub debt_symbol: String,
    pub collateral_symbol: String,
    /// Market id the collateral is hedged on.
    pub trading_pair: String,
    pub available_debt: Decimal,
    pub available_collateral: Decimal,
    pub ratio: Decimal,
    /// Debt per unit of collateral; zero when no collateral is available.
    pub price: Decimal,
    pub finished: bool,
}

impl Auction {
    /// Build an auction snapshot, applying the ratio adjustment.
    ///
    /// A ratio below one releases only that fraction of the collateral; a
    /// ratio of one or more shrinks the debt instead.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        debt_symbol: impl Into<String>,
        collateral_symbol: impl Into<String>,
        trading_pair: impl Into<String>,
        debt: Decimal,
        collateral: Decimal,
        ratio: Decimal,
        finished: bool,
    ) -> Self {
        let (available_debt, available_collateral) = if ratio < Decimal::ONE {
            (debt, collateral * ratio)
        } else {
            (debt / ratio, collateral)
        };

        let price = if available_collateral > Decimal::ZERO {
            available_debt / available_collateral
        } else {
            Decimal::ZERO
        };

        Self {
            id,
            debt_symbol: debt_symbol.into(),
            collateral_symbol: collateral_symbol.into(),
            trading_pair: trading_pair.into(),
            available_debt,
            available_collateral,
            ratio,
            price,
            finished,
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Balance of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

impl Balance {
    /// Build a balance from the on-chain total and the exchange-side lock.
    pub fn new(total: Decimal, locked: Decimal) -> Self {
        Self {
            free: total - locked,
            locked,
            total,
        }
    }
}

/// Balances for every known asset, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    balances: HashMap<String, Balance>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, balance: Balance) {
        self.balances.insert(symbol.into(), balance);
    }

    pub fn get(&self, symbol: &str) -> Option<&Balance> {
        self.balances.get(symbol)
    }

    /// Free balance of `symbol`, zero when unknown.
    pub fn free(&self, symbol: &str) -> Decimal {
        self.balances
            .get(symbol)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Balance)> {
        self.balances.iter()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order side on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle as far as the bidder cares: closed orders are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
}

/// Outcome of an exchange order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub id: String,
    pub status: OrderStatus,
    pub side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
    pub filled_amount: Decimal,
    pub average_price: Decimal,
}

impl OrderResult {
    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }
}

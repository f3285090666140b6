//! Asset and market lookup tables built from exchange metadata.

use crate::types::{Asset, Market};
use alloy::primitives::Address;
use std::collections::HashMap;

/// Known assets and markets, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    assets: HashMap<String, Asset>,
    markets: HashMap<String, Market>,
}

impl MarketRegistry {
    /// Build the registry from a market listing; assets are collected from
    /// each market's base and quote side.
    pub fn from_markets(markets: impl IntoIterator<Item = Market>) -> Self {
        let mut registry = Self::default();
        for market in markets {
            registry
                .assets
                .entry(market.base.symbol.clone())
                .or_insert_with(|| market.base.clone());
            registry
                .assets
                .entry(market.quote.symbol.clone())
                .or_insert_with(|| market.quote.clone());
            registry.markets.insert(market.id.clone(), market);
        }
        registry
    }

    pub fn asset(&self, symbol: &str) -> Option<&Asset> {
        self.assets.get(symbol)
    }

    /// Resolve an on-chain token address to a known asset.
    pub fn asset_by_address(&self, address: Address) -> Option<&Asset> {
        self.assets.values().find(|a| a.address == address)
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.get(id)
    }

    /// Market on which `collateral` can be sold for `debt`.
    ///
    /// Tries `debt-collateral` first, then `collateral-debt`.
    pub fn pair_for(&self, debt: &str, collateral: &str) -> Option<&Market> {
        self.markets
            .get(&format!("{debt}-{collateral}"))
            .or_else(|| self.markets.get(&format!("{collateral}-{debt}")))
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

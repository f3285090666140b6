//! Core domain types for the liquidation auction bidder.
//!
//! This crate provides fundamental types used throughout the bidder:
//! - `Asset`, `Market`: Exchange metadata loaded once at startup
//! - `Auction`: A decoded snapshot of one on-chain auction
//! - `Inventory`, `Balance`: Free/locked/total balances per asset
//! - `OrderResult`, `OrderSide`, `OrderStatus`: Exchange order outcomes
//! - `SettlementRecord`: One ledger row per fill attempt
//! - Raw token amount <-> decimal conversion helpers

pub mod decimal;
pub mod error;
pub mod registry;
pub mod settlement;
pub mod types;

pub use decimal::{gas_cost, gwei_to_wei, to_decimal, to_raw, NATIVE_DECIMALS};
pub use error::{CoreError, Result};
pub use registry::MarketRegistry;
pub use settlement::{SettlementRecord, SettlementStatus, NULL_HASH};
pub use types::{
    Asset, Auction, Balance, Inventory, Market, OrderResult, OrderSide, OrderStatus,
};

//! Order-book exchange interface.
//!
//! The bidder uses the exchange for market metadata, locked balances, depth
//! and USD price queries, and one-shot market orders to hedge collateral.
//!
//! - `client`: the `Exchange` trait and its REST implementation
//! - `wire`: request and response shapes
//! - `book`: order book snapshot
//! - `precision`: price and amount truncation
//! - `mock`: scripted in-memory exchange

pub mod book;
pub mod client;
pub mod error;
pub mod mock;
pub mod precision;
pub mod wire;

pub use book::{BookLevel, OrderBook, PriceLevel};
pub use client::{BoxFuture, Exchange, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use mock::{MockExchange, PlacedOrder};
pub use precision::{order_amount, order_price, truncate_to_decimals, truncate_to_sig_figs};
pub use wire::LockedBalance;

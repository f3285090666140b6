//! Profitability and sizing for liquidation auctions.
//!
//! Pure decision logic: given an auction snapshot, the current inventory, the
//! collateral's USD price and the hedge market's order book, decide how much
//! debt to repay or why the auction is skipped this block.

pub mod config;
pub mod depth;
pub mod engine;
pub mod error;

pub use config::StrategyConfig;
pub use depth::sell_receive_amount;
pub use engine::{BidEngine, Decision, Sizing};
pub use error::{Rejection, StrategyResult};

//! Fill execution and collateral hedging for the auction bidder.
//!
//! # Key Components
//!
//! - [`FillExecutor`]: sends `fillAuctionWithAmount`, waits for the receipt and
//!   turns it into a [`SettlementRecord`](auction_core::SettlementRecord)
//! - [`HedgeExecutor`]: sells received collateral with retry until filled
//! - [`InventoryReader`]: on-chain totals minus exchange locks
//! - [`FillEvent`]: amounts extracted from the fill event log

pub mod error;
pub mod events;
pub mod fill;
pub mod hedge;
pub mod inventory;

pub use error::{ExecutorError, ExecutorResult};
pub use events::{FillEvent, FILL_AUCTION_TOPIC};
pub use fill::{repay_amount, FillConfig, FillExecutor, FillState, DEFAULT_GAS_LIMIT};
pub use hedge::{hedge_order, HedgeConfig, HedgeExecutor, HedgeOutcome};
pub use inventory::InventoryReader;

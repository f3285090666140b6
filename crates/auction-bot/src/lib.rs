//! Liquidation auction bidder.
//!
//! Main application that orchestrates all components:
//! - Block scheduler driving one scan per new block
//! - Auction decoding and bid decisions
//! - Fill execution on chain and collateral hedging on the exchange
//! - Settlement ledger

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, ScanSummary};
pub use config::{AppConfig, Network};
pub use error::{AppError, AppResult};

//! Auction decoding.
//!
//! Turns the fixed-layout `getAuctionDetails` result into an `Auction`
//! snapshot, resolving asset addresses and the hedge market against the
//! `MarketRegistry` built at startup.

pub mod decoder;
pub mod error;
pub mod layout;

pub use decoder::{decode_auction_ids, AuctionDecoder, DEFAULT_DEBT_GROWTH_FACTOR};
pub use error::{DecodeError, DecodeResult};

//! Decoder error types.

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed auction data for auction {auction_id}: {reason}")]
    MalformedAuctionData { auction_id: u32, reason: String },

    #[error("Malformed auction id list: {0}")]
    MalformedAuctionIds(String),

    #[error("Auction {auction_id} references unknown asset {address}")]
    UnknownAsset { auction_id: u32, address: Address },

    #[error("No market for {debt}/{collateral}")]
    UnknownMarket { debt: String, collateral: String },

    #[error("Amount error: {0}")]
    Amount(#[from] auction_core::CoreError),

    #[error("Chain error: {0}")]
    Chain(#[from] auction_chain::ChainError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

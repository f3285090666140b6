//! Chain error types.

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No key loaded for sender {0}")]
    UnknownSender(Address),

    #[error("Signer error: {0}")]
    Signer(#[from] auction_signer::SignerError),

    #[error("Amount error: {0}")]
    Core(#[from] auction_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,
}

impl ChainError {
    /// Whether the error came from the network rather than from the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rpc { .. })
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

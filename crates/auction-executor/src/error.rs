//! Executor error types.

use alloy::primitives::B256;
use auction_chain::ChainError;
use auction_core::{CoreError, SettlementRecord};
use auction_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The fill succeeded on chain but its amounts could not be read.
    /// `record` charges the gas and leaves the amounts for manual review.
    #[error("Auction {auction_id}: fill {tx_hash} mined but not reconciled: {reason}")]
    Unreconciled {
        auction_id: u32,
        tx_hash: B256,
        reason: String,
        record: Box<SettlementRecord>,
    },

    /// The fill was sent but its receipt was never observed.
    /// `record` is pending and must be reconciled later.
    #[error("Fill {} sent but unconfirmed", .record.tx_hash)]
    Unconfirmed { record: Box<SettlementRecord> },

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Amount error: {0}")]
    Core(#[from] CoreError),

    #[error("Cancelled")]
    Cancelled,
}

impl ExecutorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Unconfirmed { .. } | Self::Chain(ChainError::Cancelled)
        )
    }

    /// Ledger record a failed fill still owes, if the transaction was sent.
    pub fn settlement(&self) -> Option<&SettlementRecord> {
        match self {
            Self::Unreconciled { record, .. } | Self::Unconfirmed { record } => Some(record),
            _ => None,
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

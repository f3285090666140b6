//! Transaction receipts and the cancellable receipt wait.

use crate::error::{ChainError, ChainResult};
use crate::rpc::{parse_quantity, ChainRpc};
use alloy::primitives::{Address, Bytes, B256};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Emitted event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// `false` when the transaction reverted.
    pub success: bool,
    pub gas_used: u64,
    /// Price actually paid per gas in wei, when the node reports it.
    pub effective_gas_price: Option<u64>,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// First log whose topic0 equals `topic`.
    pub fn find_log(&self, topic: B256) -> Option<&Log> {
        self.logs
            .iter()
            .find(|log| log.topics.first() == Some(&topic))
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
    gas_used: String,
    #[serde(default)]
    effective_gas_price: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    data: String,
}

impl TryFrom<RawReceipt> for Receipt {
    type Error = ChainError;

    fn try_from(raw: RawReceipt) -> ChainResult<Self> {
        let logs = raw
            .logs
            .into_iter()
            .map(Log::try_from)
            .collect::<ChainResult<Vec<_>>>()?;

        Ok(Self {
            tx_hash: parse_hex(&raw.transaction_hash)?,
            block_number: raw
                .block_number
                .as_deref()
                .map(parse_quantity)
                .transpose()?
                .unwrap_or(0),
            // "0x0" marks a revert.
            success: raw.status.as_deref() != Some("0x0"),
            gas_used: parse_quantity(&raw.gas_used)?,
            effective_gas_price: raw
                .effective_gas_price
                .as_deref()
                .map(parse_quantity)
                .transpose()?,
            logs,
        })
    }
}

impl TryFrom<RawLog> for Log {
    type Error = ChainError;

    fn try_from(raw: RawLog) -> ChainResult<Self> {
        Ok(Self {
            address: parse_hex(&raw.address)?,
            topics: raw
                .topics
                .iter()
                .map(|t| parse_hex(t))
                .collect::<ChainResult<Vec<_>>>()?,
            data: parse_hex(&raw.data)?,
        })
    }
}

fn parse_hex<T>(value: &str) -> ChainResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(value).map_err(|e| ChainError::InvalidResponse(format!("{value}: {e}")))
}

// =============================================================================
// Receipt wait
// =============================================================================

/// Poll for the receipt of `tx_hash` every `interval` until it is mined.
///
/// Transport errors and pending results are retried indefinitely; the only
/// way out without a receipt is `cancel`.
///
/// # Errors
/// Returns `ChainError::Cancelled` if `cancel` fires before the receipt lands.
pub async fn wait_for_receipt(
    rpc: &dyn ChainRpc,
    tx_hash: B256,
    interval: Duration,
    cancel: &CancellationToken,
) -> ChainResult<Receipt> {
    let mut polls = 0u64;
    loop {
        polls += 1;
        match rpc.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) if receipt.block_number != 0 => {
                debug!(%tx_hash, polls, block = receipt.block_number, "Receipt received");
                return Ok(receipt);
            }
            Ok(_) => {}
            Err(e) => warn!(%tx_hash, error = %e, "Receipt poll failed, retrying"),
        }

        // Wait for interval OR shutdown signal (cancellation-aware sleep)
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = cancel.cancelled() => {
                info!(%tx_hash, polls, "Shutdown requested while waiting for receipt");
                return Err(ChainError::Cancelled);
            }
        }
    }
}

//! Ethereum JSON-RPC transport.
//!
//! Provides a trait-based abstraction over the handful of RPC methods the
//! bidder needs. This allows for:
//! - Dependency injection for testing (`MockChainRpc`)
//! - Separation of ABI handling from transport

use crate::error::{ChainError, ChainResult};
use crate::receipt::{RawReceipt, Receipt};
use alloy::primitives::{keccak256, Address, Bytes, B256};
use parking_lot::Mutex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chain RPC methods consumed by the bidder.
pub trait ChainRpc: Send + Sync {
    /// `eth_blockNumber`.
    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>>;

    /// `eth_call` against `latest`; returns the raw `0x`-prefixed hex result.
    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, ChainResult<String>>;

    /// `eth_getTransactionCount` at `latest`.
    fn transaction_count(&self, address: Address) -> BoxFuture<'_, ChainResult<u64>>;

    /// `eth_sendRawTransaction`.
    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, ChainResult<B256>>;

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending.
    fn transaction_receipt(&self, hash: B256) -> BoxFuture<'_, ChainResult<Option<Receipt>>>;
}

// =============================================================================
// HTTP transport
// =============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP.
pub struct HttpRpc {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpc {
    /// Create a new RPC client.
    ///
    /// # Arguments
    /// * `url` - Node endpoint (e.g., "https://mainnet.infura.io/v3/<project>")
    pub fn new(url: impl Into<String>) -> ChainResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!("{method} HTTP {status}: {body}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        trace!(method, "RPC response received");
        Ok(serde_json::from_value(body.result)?)
    }
}

impl ChainRpc for HttpRpc {
    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            let height: String = self.request("eth_blockNumber", json!([])).await?;
            parse_quantity(&height)
        })
    }

    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, ChainResult<String>> {
        Box::pin(async move {
            let params = json!([
                {
                    "from": format!("{:#x}", Address::ZERO),
                    "to": format!("{to:#x}"),
                    "data": format!("0x{}", hex::encode(&data)),
                },
                "latest"
            ]);
            self.request("eth_call", params).await
        })
    }

    fn transaction_count(&self, address: Address) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            let count: String = self
                .request(
                    "eth_getTransactionCount",
                    json!([format!("{address:#x}"), "latest"]),
                )
                .await?;
            parse_quantity(&count)
        })
    }

    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, ChainResult<B256>> {
        Box::pin(async move {
            let hash: String = self
                .request(
                    "eth_sendRawTransaction",
                    json!([format!("0x{}", hex::encode(&raw))]),
                )
                .await?;
            B256::from_str(&hash)
                .map_err(|e| ChainError::InvalidResponse(format!("tx hash {hash}: {e}")))
        })
    }

    fn transaction_receipt(&self, hash: B256) -> BoxFuture<'_, ChainResult<Option<Receipt>>> {
        Box::pin(async move {
            let raw: Option<RawReceipt> = self
                .request("eth_getTransactionReceipt", json!([format!("{hash:#x}")]))
                .await?;
            raw.map(Receipt::try_from).transpose()
        })
    }
}

/// Parse a hex quantity (`0x1b4`). `0x` alone is zero.
pub(crate) fn parse_quantity(value: &str) -> ChainResult<u64> {
    let digits = value.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("quantity {value}: {e}")))
}

// =============================================================================
// Mock
// =============================================================================

/// In-memory chain for testing.
///
/// Block heights are served from a script (`None` entries fail with a
/// transport error); call results are keyed by calldata; a receipt template is
/// attached to every raw transaction sent.
#[derive(Debug, Default)]
pub struct MockChainRpc {
    blocks: Mutex<VecDeque<Option<u64>>>,
    last_block: AtomicU64,
    call_responses: Mutex<HashMap<Bytes, String>>,
    calls: Mutex<Vec<(Address, Bytes)>>,
    nonce: AtomicU64,
    sent: Mutex<Vec<Bytes>>,
    next_receipt: Mutex<Option<Receipt>>,
    receipts: Mutex<HashMap<B256, Receipt>>,
    pending_polls: AtomicU64,
    receipt_polls: AtomicU64,
}

impl MockChainRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a block height (`None` = transport failure).
    pub fn push_block(&self, height: Option<u64>) {
        self.blocks.lock().push_back(height);
    }

    pub fn set_call_response(&self, data: Bytes, hex_result: impl Into<String>) {
        self.call_responses.lock().insert(data, hex_result.into());
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    /// Receipt returned for the next sent transaction (its hash is overwritten).
    pub fn set_next_receipt(&self, receipt: Receipt) {
        *self.next_receipt.lock() = Some(receipt);
    }

    /// Number of receipt polls answered with "pending" before the receipt appears.
    pub fn set_pending_polls(&self, polls: u64) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    pub fn recorded_calls(&self) -> Vec<(Address, Bytes)> {
        self.calls.lock().clone()
    }

    pub fn receipt_polls(&self) -> u64 {
        self.receipt_polls.load(Ordering::SeqCst)
    }
}

impl ChainRpc for MockChainRpc {
    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            match self.blocks.lock().pop_front() {
                Some(Some(height)) => {
                    self.last_block.store(height, Ordering::SeqCst);
                    Ok(height)
                }
                Some(None) => Err(ChainError::Transport("scripted failure".to_string())),
                None => Ok(self.last_block.load(Ordering::SeqCst)),
            }
        })
    }

    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, ChainResult<String>> {
        Box::pin(async move {
            self.calls.lock().push((to, data.clone()));
            self.call_responses
                .lock()
                .get(&data)
                .cloned()
                .ok_or_else(|| ChainError::Rpc {
                    code: -32000,
                    message: "execution reverted".to_string(),
                })
        })
    }

    fn transaction_count(&self, _address: Address) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move { Ok(self.nonce.load(Ordering::SeqCst)) })
    }

    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, ChainResult<B256>> {
        Box::pin(async move {
            let hash = keccak256(&raw);
            self.sent.lock().push(raw);
            if let Some(mut receipt) = self.next_receipt.lock().take() {
                receipt.tx_hash = hash;
                self.receipts.lock().insert(hash, receipt);
            }
            Ok(hash)
        })
    }

    fn transaction_receipt(&self, hash: B256) -> BoxFuture<'_, ChainResult<Option<Receipt>>> {
        Box::pin(async move {
            self.receipt_polls.fetch_add(1, Ordering::SeqCst);
            let pending = self.pending_polls.load(Ordering::SeqCst);
            if pending > 0 {
                self.pending_polls.store(pending - 1, Ordering::SeqCst);
                return Ok(None);
            }
            Ok(self.receipts.lock().get(&hash).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_rpc_response_error_body() {
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        let error = body.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "nonce too low");
        assert!(body.result.is_null());
    }

    #[tokio::test]
    async fn test_mock_block_script() {
        let rpc = MockChainRpc::new();
        rpc.push_block(Some(10));
        rpc.push_block(None);

        assert_eq!(rpc.block_number().await.unwrap(), 10);
        assert!(rpc.block_number().await.unwrap_err().is_transport());
        // Script exhausted: the last height is repeated.
        assert_eq!(rpc.block_number().await.unwrap(), 10);
    }
}

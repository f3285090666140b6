//! Read calls and signed sends against the auction contract.

use crate::abi::{self, AbiWords};
use crate::error::{ChainError, ChainResult};
use crate::rpc::ChainRpc;
use alloy::primitives::{Address, Bytes, B256, U256};
use auction_signer::{KeyContext, UnsignedTransaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sender-side parameters of a contract transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendParams {
    pub from: Address,
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    pub nonce: u64,
}

/// Handle to the deployed auction contract.
#[derive(Clone)]
pub struct AuctionContract {
    rpc: Arc<dyn ChainRpc>,
    address: Address,
    chain_id: u64,
}

impl AuctionContract {
    pub fn new(rpc: Arc<dyn ChainRpc>, address: Address, chain_id: u64) -> Self {
        Self {
            rpc,
            address,
            chain_id,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc(&self) -> &dyn ChainRpc {
        self.rpc.as_ref()
    }

    /// Read-only call; returns the raw hex result.
    pub async fn call(&self, data: Bytes) -> ChainResult<String> {
        self.rpc.call(self.address, data).await
    }

    /// Raw `getCurrentAuctions()` result.
    pub async fn current_auctions(&self) -> ChainResult<String> {
        self.call(abi::get_current_auctions_call()).await
    }

    /// Raw `getAuctionDetails(auctionID)` result.
    pub async fn auction_details(&self, auction_id: u32) -> ChainResult<String> {
        self.call(abi::get_auction_details_call(auction_id)).await
    }

    /// Raw on-chain balance of `asset` held for `owner`.
    pub async fn balance_of(&self, asset: Address, owner: Address) -> ChainResult<U256> {
        let result = self.call(abi::balance_of_call(asset, owner)).await?;
        AbiWords::from_hex(&result)?
            .uint(0)
            .ok_or_else(|| ChainError::InvalidResponse(format!("empty balanceOf result for {asset}")))
    }

    pub async fn current_block_height(&self) -> ChainResult<u64> {
        self.rpc.block_number().await
    }

    /// Next nonce for `address` (transaction count at `latest`).
    pub async fn next_nonce(&self, address: Address) -> ChainResult<u64> {
        self.rpc.transaction_count(address).await
    }

    /// Sign `data` as a call to this contract and submit it.
    ///
    /// # Errors
    /// Returns `ChainError::UnknownSender` if `key` does not belong to
    /// `params.from`, or the signing/transport error.
    pub async fn send(&self, key: &KeyContext, params: &SendParams, data: Bytes) -> ChainResult<B256> {
        if key.address() != params.from {
            return Err(ChainError::UnknownSender(params.from));
        }

        let tx = UnsignedTransaction {
            nonce: params.nonce,
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            to: self.address,
            value: U256::ZERO,
            input: data,
        };
        let signed = key.sign_transaction(&tx, self.chain_id)?;
        debug!(tx_hash = %signed.hash, nonce = params.nonce, "Signed transaction");

        let tx_hash = self.rpc.send_raw_transaction(signed.raw).await?;
        if tx_hash != signed.hash {
            warn!(local = %signed.hash, remote = %tx_hash, "Node returned unexpected tx hash");
        }

        info!(
            %tx_hash,
            nonce = params.nonce,
            gas_price = params.gas_price,
            gas_limit = params.gas_limit,
            "Transaction submitted"
        );
        Ok(tx_hash)
    }

    /// Submit `fillAuctionWithAmount(auctionID, repayAmount)`.
    pub async fn fill_auction_with_amount(
        &self,
        key: &KeyContext,
        params: &SendParams,
        auction_id: u32,
        repay_amount: U256,
    ) -> ChainResult<B256> {
        let data = abi::fill_auction_with_amount_call(auction_id, repay_amount);
        self.send(key, params, data).await
    }
}

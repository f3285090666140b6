//! EIP-155 legacy transaction signing.

use crate::error::SignerResult;
use crate::key::KeyContext;
use crate::sign::CompactSignature;
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::SignerSync;

/// Transaction fields before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

/// A signed, RLP-encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
    pub from: Address,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub signature: CompactSignature,
}

impl SignedTransaction {
    /// `0x`-prefixed raw bytes.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl KeyContext {
    /// Sign `tx` bound to `chain_id` and encode it.
    ///
    /// # Errors
    /// Returns `SignerError::SigningFailed` if the signer rejects the digest.
    pub fn sign_transaction(
        &self,
        tx: &UnsignedTransaction,
        chain_id: u64,
    ) -> SignerResult<SignedTransaction> {
        let legacy = TxLegacy {
            chain_id: Some(chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.input.clone(),
        };

        let signature = self.signer().sign_hash_sync(&legacy.signature_hash())?;
        let signed = legacy.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::from(signed).encoded_2718();

        Ok(SignedTransaction {
            hash,
            raw: raw.into(),
            from: self.address(),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            signature: signature.into(),
        })
    }
}

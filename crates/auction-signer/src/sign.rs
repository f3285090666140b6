//! Hash and personal-message signing.
//!
//! Signatures are kept in the 65-byte `r || s || v` layout with `v` in `{0, 1}`,
//! the form the chain expects inside transactions. Personal-message consumers
//! (the exchange) expect `v` in `{27, 28}`; use [`CompactSignature::to_personal_hex`].

use crate::error::{SignerError, SignerResult};
use crate::key::KeyContext;
use alloy::primitives::{eip191_hash_message, keccak256, Address, PrimitiveSignature, B256, U256};
use alloy::signers::SignerSync;
use std::fmt;

/// Length of a compact signature.
const SIGNATURE_LEN: usize = 65;

/// Offset added to `v` by the personal-message convention.
const PERSONAL_V_OFFSET: u8 = 27;

// =============================================================================
// CompactSignature
// =============================================================================

/// 65-byte recoverable ECDSA signature, `v` normalized to `{0, 1}`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature([u8; SIGNATURE_LEN]);

impl CompactSignature {
    /// Parse a 65-byte signature, accepting `v` as `{0, 1}` or `{27, 28}`.
    ///
    /// # Errors
    /// Returns `SignerError::InvalidSignature` on wrong length or unknown `v`.
    pub fn from_bytes(bytes: &[u8]) -> SignerResult<Self> {
        let bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            SignerError::InvalidSignature(format!("expected 65 bytes, got {}", bytes.len()))
        })?;

        let mut out = bytes;
        out[64] = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - PERSONAL_V_OFFSET,
            v => return Err(SignerError::InvalidSignature(format!("invalid v: {v}"))),
        };
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn r(&self) -> B256 {
        B256::from_slice(&self.0[0..32])
    }

    pub fn s(&self) -> B256 {
        B256::from_slice(&self.0[32..64])
    }

    /// Recovery id, `0` or `1`.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Bytes with `v` shifted to `{27, 28}`.
    pub fn to_personal_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = self.0;
        out[64] += PERSONAL_V_OFFSET;
        out
    }

    /// `0x`-prefixed hex with `v` in `{27, 28}`.
    pub fn to_personal_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_personal_bytes()))
    }

    fn to_primitive(self) -> PrimitiveSignature {
        PrimitiveSignature::new(
            U256::from_be_slice(&self.0[0..32]),
            U256::from_be_slice(&self.0[32..64]),
            self.v() == 1,
        )
    }
}

impl From<PrimitiveSignature> for CompactSignature {
    fn from(sig: PrimitiveSignature) -> Self {
        let mut out = [0u8; SIGNATURE_LEN];
        out[0..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
        out[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
        out[64] = u8::from(sig.v());
        Self(out)
    }
}

impl From<CompactSignature> for PrimitiveSignature {
    fn from(sig: CompactSignature) -> Self {
        sig.to_primitive()
    }
}

impl fmt::Debug for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactSignature")
            .field("v", &self.v())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PublicKey
// =============================================================================

/// Uncompressed secp256k1 public key (64 bytes, no `0x04` prefix).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; 64]);

impl PublicKey {
    /// Build from SEC1 uncompressed encoding (`0x04 || x || y`) or raw `x || y`.
    pub(crate) fn from_uncompressed(bytes: &[u8]) -> Self {
        let raw = if bytes.len() == 65 { &bytes[1..] } else { bytes };
        let mut out = [0u8; 64];
        out.copy_from_slice(&raw[..64]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Last 20 bytes of the Keccak-256 hash of the point.
    pub fn to_address(&self) -> Address {
        Address::from_slice(&keccak256(self.0)[12..])
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x{})", hex::encode(self.0))
    }
}

// =============================================================================
// Signing
// =============================================================================

impl KeyContext {
    /// Sign a 32-byte digest with deterministic ECDSA.
    ///
    /// # Errors
    /// Returns `SignerError::InvalidHashLength` if `hash` is not 32 bytes.
    pub fn sign_hash(&self, hash: &[u8]) -> SignerResult<CompactSignature> {
        let digest = to_digest(hash)?;
        let signature = self.signer().sign_hash_sync(&digest)?;
        Ok(signature.into())
    }

    /// Sign `message` under the `"\x19Ethereum Signed Message:\n" + len` prefix.
    pub fn personal_sign(&self, message: &[u8]) -> SignerResult<CompactSignature> {
        self.sign_hash(eip191_hash_message(message).as_slice())
    }
}

/// Recover the public key that produced `signature` over `hash`.
///
/// # Errors
/// Returns `SignerError::InvalidHashLength` or `SignerError::Recovery`.
pub fn recover(hash: &[u8], signature: &CompactSignature) -> SignerResult<PublicKey> {
    let digest = to_digest(hash)?;
    let verifying_key = signature
        .to_primitive()
        .recover_from_prehash(&digest)
        .map_err(|e| SignerError::Recovery(e.to_string()))?;
    Ok(PublicKey::from_uncompressed(
        verifying_key.to_encoded_point(false).as_bytes(),
    ))
}

/// Recover the address that personal-signed `message`.
pub fn personal_recover(message: &[u8], signature: &CompactSignature) -> SignerResult<Address> {
    recover(eip191_hash_message(message).as_slice(), signature).map(|pk| pk.to_address())
}

fn to_digest(hash: &[u8]) -> SignerResult<B256> {
    if hash.len() != 32 {
        return Err(SignerError::InvalidHashLength(hash.len()));
    }
    Ok(B256::from_slice(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn ctx() -> KeyContext {
        KeyContext::from_hex(TEST_PRIVATE_KEY).unwrap()
    }

    #[test]
    fn test_sign_and_recover_public_key() {
        let ctx = ctx();
        for seed in [b"a".as_slice(), b"auction", b"\x00\x01\x02"] {
            let hash = keccak256(seed);
            let sig = ctx.sign_hash(hash.as_slice()).unwrap();
            assert!(sig.v() <= 1);
            assert_eq!(recover(hash.as_slice(), &sig).unwrap(), ctx.public_key());
        }
    }

    #[test]
    fn test_sign_is_deterministic() {
        let ctx = ctx();
        let hash = keccak256(b"fill");
        assert_eq!(
            ctx.sign_hash(hash.as_slice()).unwrap(),
            ctx.sign_hash(hash.as_slice()).unwrap()
        );
    }

    #[test]
    fn test_sign_rejects_bad_hash_length() {
        assert!(matches!(
            ctx().sign_hash(&[0u8; 31]),
            Err(SignerError::InvalidHashLength(31))
        ));
        assert!(matches!(
            recover(&[0u8; 33], &ctx().sign_hash(&[1u8; 32]).unwrap()),
            Err(SignerError::InvalidHashLength(33))
        ));
    }

    #[test]
    fn test_personal_sign_and_recover() {
        let ctx = ctx();
        let message = b"HYDRO-AUTHENTICATION@1566380397473";
        let sig = ctx.personal_sign(message).unwrap();
        assert_eq!(personal_recover(message, &sig).unwrap(), ctx.address());
        assert_ne!(personal_recover(b"other", &sig).unwrap(), ctx.address());
    }

    #[test]
    fn test_personal_hex_uses_27_28() {
        let sig = ctx().personal_sign(b"order").unwrap();
        let hex_sig = sig.to_personal_hex();
        assert!(hex_sig.starts_with("0x"));
        assert_eq!(hex_sig.len(), 2 + 130);

        let v = u8::from_str_radix(&hex_sig[130..132], 16).unwrap();
        assert!(v == 27 || v == 28);
    }

    #[test]
    fn test_from_bytes_normalizes_v() {
        let sig = ctx().sign_hash(&[7u8; 32]).unwrap();
        let parsed = CompactSignature::from_bytes(&sig.to_personal_bytes()).unwrap();
        assert_eq!(parsed, sig);

        let mut bad = *sig.as_bytes();
        bad[64] = 5;
        assert!(CompactSignature::from_bytes(&bad).is_err());
        assert!(CompactSignature::from_bytes(&bad[..64]).is_err());
    }
}

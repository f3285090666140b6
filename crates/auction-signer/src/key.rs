//! Private key loading and the signing context built around it.

use crate::error::KeyError;
use crate::sign::PublicKey;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Length of a secp256k1 private scalar.
const SECRET_KEY_LEN: usize = 32;

/// Source of the private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// The bot's signing identity.
///
/// Security notes:
/// - The private scalar lives inside `PrivateKeySigner` and is never handed out.
/// - Loaded once at startup and shared read-only by the fill and hedge paths.
/// - Never log key material or signatures.
pub struct KeyContext {
    signer: PrivateKeySigner,
    address: Address,
}

impl KeyContext {
    /// Load the key from `source` and optionally verify its address.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is out of range or not 32 bytes
    /// - Address mismatch
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let secret_bytes = match source {
            KeySource::EnvVar { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };

        let context = Self::from_bytes(&secret_bytes)?;

        if let Some(expected) = expected_address {
            if context.address != expected {
                return Err(KeyError::AddressMismatch {
                    expected,
                    actual: context.address,
                });
            }
        }

        Ok(context)
    }

    /// Build a context from a raw 32-byte scalar.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` if the length is not 32 or the scalar is
    /// zero or not below the curve order.
    pub fn from_bytes(secret_bytes: &[u8]) -> Result<Self, KeyError> {
        if secret_bytes.len() != SECRET_KEY_LEN {
            return Err(KeyError::InvalidKey(format!(
                "expected {SECRET_KEY_LEN} bytes, got {}",
                secret_bytes.len()
            )));
        }

        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        Ok(Self {
            address: signer.address(),
            signer,
        })
    }

    /// Build a context from a hex string (`0x` prefix and whitespace allowed).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&parse_hex_key(hex_str)?)
    }

    /// Address derived from the key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Uncompressed public key, without the `0x04` prefix.
    pub fn public_key(&self) -> PublicKey {
        let point = self.signer.credential().verifying_key().to_encoded_point(false);
        PublicKey::from_uncompressed(point.as_bytes())
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyContext")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Derive the account address of a raw private key.
///
/// # Errors
/// Same conditions as [`KeyContext::from_bytes`].
pub fn derive_address(secret_bytes: &[u8]) -> Result<Address, KeyError> {
    KeyContext::from_bytes(secret_bytes).map(|ctx| ctx.address())
}

fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use std::io::Write;

    // Well-known test private key (DO NOT use in production)
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn test_derive_address() {
        let bytes = hex::decode(TEST_PRIVATE_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(derive_address(&bytes).unwrap(), TEST_ADDRESS);
    }

    #[test]
    fn test_rejects_zero_scalar() {
        assert!(matches!(
            KeyContext::from_bytes(&[0u8; 32]),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_rejects_scalar_above_curve_order() {
        assert!(matches!(
            KeyContext::from_bytes(&[0xffu8; 32]),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            KeyContext::from_bytes(&[1u8; 31]),
            Err(KeyError::InvalidKey(_))
        ));
        assert!(matches!(
            KeyContext::from_bytes(&[1u8; 33]),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_load_from_file_with_whitespace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  {TEST_PRIVATE_KEY}  ").unwrap();

        let source = KeySource::File {
            path: file.path().to_path_buf(),
        };
        let ctx = KeyContext::load(&source, Some(TEST_ADDRESS)).unwrap();
        assert_eq!(ctx.address(), TEST_ADDRESS);
    }

    #[test]
    fn test_load_address_mismatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{TEST_PRIVATE_KEY}").unwrap();

        let source = KeySource::File {
            path: file.path().to_path_buf(),
        };
        let result = KeyContext::load(&source, Some(Address::ZERO));
        assert!(matches!(result, Err(KeyError::AddressMismatch { .. })));
    }

    #[test]
    fn test_load_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "AUCTION_SIGNER_TEST_UNSET_KEY".to_string(),
        };
        assert!(matches!(
            KeyContext::load(&source, None),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_public_key_hashes_to_address() {
        let ctx = KeyContext::from_hex(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(ctx.public_key().to_address(), ctx.address());
    }

    #[test]
    fn test_debug_hides_key() {
        let ctx = KeyContext::from_hex(TEST_PRIVATE_KEY).unwrap();
        let debug = format!("{ctx:?}");
        assert!(!debug.contains("ac0974bec39a17e3"));
    }
}

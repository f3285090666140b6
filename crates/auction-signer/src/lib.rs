//! Signing core for the auction bidder.
//!
//! Holds the bot's single secp256k1 identity and everything signed with it:
//! - `KeyContext`: loads the private key once and never exposes it
//! - `CompactSignature`: 65-byte r||s||v signatures, hash and personal-message signing
//! - `sign_transaction`: EIP-155 legacy transactions for the fill call
//! - `AuthTokenCache`: time-boxed exchange authentication header

pub mod auth;
pub mod clock;
pub mod error;
pub mod key;
pub mod sign;
pub mod tx;

pub use auth::{AuthTokenCache, AUTH_HEADER, DEFAULT_AUTH_TTL_MS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{KeyError, SignerError, SignerResult};
pub use key::{derive_address, KeyContext, KeySource};
pub use sign::{personal_recover, recover, CompactSignature, PublicKey};
pub use tx::{SignedTransaction, UnsignedTransaction};

//! Exchange authentication token with time-boxed caching.
//!
//! Token format: `<lowercase address>#HYDRO-AUTHENTICATION@<ms>#<personal signature>`.
//! The token is re-signed once it is older than the configured TTL. Refresh is
//! idempotent, so a racing refresh costs one extra signature and nothing else.

use crate::clock::{Clock, SystemClock};
use crate::error::SignerResult;
use crate::key::KeyContext;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// HTTP header carrying the token.
pub const AUTH_HEADER: &str = "Hydro-Authentication";

/// Default token lifetime (200 seconds).
pub const DEFAULT_AUTH_TTL_MS: u64 = 200_000;

const AUTH_MESSAGE_PREFIX: &str = "HYDRO-AUTHENTICATION@";

struct CachedToken {
    value: String,
    issued_at_ms: u64,
}

/// Cached exchange authentication header.
pub struct AuthTokenCache<C: Clock = SystemClock> {
    key: Arc<KeyContext>,
    clock: C,
    ttl_ms: u64,
    cached: Mutex<Option<CachedToken>>,
}

impl AuthTokenCache<SystemClock> {
    pub fn new(key: Arc<KeyContext>) -> Self {
        Self::with_clock(key, SystemClock, DEFAULT_AUTH_TTL_MS)
    }
}

impl<C: Clock> AuthTokenCache<C> {
    pub fn with_clock(key: Arc<KeyContext>, clock: C, ttl_ms: u64) -> Self {
        Self {
            key,
            clock,
            ttl_ms,
            cached: Mutex::new(None),
        }
    }

    /// Current header value, re-signed if the cached one has expired.
    ///
    /// # Errors
    /// Returns `SignerError` if signing the timestamp message fails.
    pub fn token(&self) -> SignerResult<String> {
        let now = self.clock.now_ms();

        let mut cached = self.cached.lock();
        if let Some(token) = cached.as_ref() {
            if now.saturating_sub(token.issued_at_ms) < self.ttl_ms {
                return Ok(token.value.clone());
            }
        }

        let message = format!("{AUTH_MESSAGE_PREFIX}{now}");
        let signature = self.key.personal_sign(message.as_bytes())?;
        let value = format!(
            "{:#x}#{}#{}",
            self.key.address(),
            message,
            signature.to_personal_hex()
        );

        debug!(issued_at_ms = now, "Refreshed exchange auth token");

        *cached = Some(CachedToken {
            value: value.clone(),
            issued_at_ms: now,
        });
        Ok(value)
    }

    pub fn address(&self) -> alloy::primitives::Address {
        self.key.address()
    }

    /// Personal-sign arbitrary bytes with the same identity.
    pub fn sign_message(&self, message: &[u8]) -> SignerResult<String> {
        Ok(self.key.personal_sign(message)?.to_personal_hex())
    }
}

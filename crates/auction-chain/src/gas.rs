//! Gas price hint.
//!
//! The gas station endpoint reports price tiers in tenths of a gwei. The
//! `fast` tier is used, truncated to whole gwei and capped. Any failure falls
//! back to a fixed price so a fill is never blocked on the hint.

use crate::rpc::BoxFuture;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for the gas station request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the suggested gas price, in gwei.
pub trait GasPriceSource: Send + Sync {
    fn gas_price_gwei(&self) -> BoxFuture<'_, Decimal>;
}

#[derive(Debug, Deserialize)]
struct GasStationResponse {
    fast: Decimal,
}

/// Gas station JSON endpoint with fallback and cap.
pub struct GasStationOracle {
    client: Option<Client>,
    url: String,
    fallback_gwei: Decimal,
    cap_gwei: Decimal,
}

impl GasStationOracle {
    pub fn new(url: impl Into<String>, fallback_gwei: Decimal, cap_gwei: Decimal) -> Self {
        let client = match Client::builder().timeout(DEFAULT_TIMEOUT).build() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Failed to create gas station client, using fallback price");
                None
            }
        };

        Self {
            client,
            url: url.into(),
            fallback_gwei,
            cap_gwei,
        }
    }

    async fn fetch(&self) -> Option<Decimal> {
        let client = self.client.as_ref()?;
        let response = client.get(&self.url).send().await.ok()?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "Gas station returned error status");
            return None;
        }
        let body: GasStationResponse = response.json().await.ok()?;
        Some(tenths_to_gwei(body.fast, self.cap_gwei))
    }
}

impl GasPriceSource for GasStationOracle {
    fn gas_price_gwei(&self) -> BoxFuture<'_, Decimal> {
        Box::pin(async move {
            match self.fetch().await {
                Some(gwei) => {
                    debug!(%gwei, "Gas price hint");
                    gwei
                }
                None => {
                    warn!(fallback = %self.fallback_gwei, "Gas price hint unavailable, using fallback");
                    self.fallback_gwei
                }
            }
        })
    }
}

/// Constant gas price.
#[derive(Debug, Clone, Copy)]
pub struct FixedGasPrice(pub Decimal);

impl GasPriceSource for FixedGasPrice {
    fn gas_price_gwei(&self) -> BoxFuture<'_, Decimal> {
        Box::pin(async move { self.0 })
    }
}

/// Convert a tenths-of-gwei tier to whole gwei, capped at `cap_gwei`.
fn tenths_to_gwei(tenths: Decimal, cap_gwei: Decimal) -> Decimal {
    (tenths / Decimal::TEN).trunc().min(cap_gwei)
}

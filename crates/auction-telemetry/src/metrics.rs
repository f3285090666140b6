//! Prometheus metrics for the auction bidder.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means duplicate
//! metric names, which is a programming error and only surfaces during static
//! initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, Encoder,
    IntCounter, IntGauge, TextEncoder,
};
use std::path::Path;

/// Last block height the scan loop processed.
pub static LAST_BLOCK: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("auction_last_block", "Last processed block height").unwrap()
});

/// Auctions read from the contract.
pub static AUCTIONS_SCANNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("auction_scanned_total", "Total auctions scanned").unwrap()
});

/// Auctions skipped, by reason.
/// Labels: reason (market_not_allowed/zero_balance/not_profitable/price_unavailable/...)
pub static REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auction_rejections_total",
        "Total auctions rejected before filling",
        &["reason"]
    )
    .unwrap()
});

/// Fill attempts, by outcome.
/// Labels: outcome (filled/reverted/unreconciled/unconfirmed/error/cancelled)
pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auction_fills_total",
        "Total fill attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Hedge order attempts, including failed ones.
pub static HEDGE_ATTEMPTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("auction_hedge_attempts_total", "Total hedge order attempts").unwrap()
});

/// Hedges abandoned on shutdown.
pub static HEDGE_ABANDONED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auction_hedge_abandoned_total",
        "Hedges interrupted by shutdown"
    )
    .unwrap()
});

/// Metric helpers.
pub struct Metrics;

impl Metrics {
    pub fn block_processed(height: u64) {
        LAST_BLOCK.set(i64::try_from(height).unwrap_or(i64::MAX));
    }

    pub fn auction_scanned() {
        AUCTIONS_SCANNED_TOTAL.inc();
    }

    pub fn rejected(reason: &str) {
        REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a fill outcome such as `filled`, `reverted` or `unconfirmed`.
    pub fn fill(outcome: &str) {
        FILLS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn hedge_attempts(attempts: u64) {
        HEDGE_ATTEMPTS_TOTAL.inc_by(attempts);
    }

    pub fn hedge_abandoned() {
        HEDGE_ABANDONED_TOTAL.inc();
    }

    /// All registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write `render()` to `path` through a temp file and rename, so a
    /// textfile collector never reads a partial file.
    pub fn write_textfile(path: &Path) -> TelemetryResult<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, Self::render()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

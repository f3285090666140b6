//! Prometheus metrics and structured logging for the auction bidder.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - Prometheus counters for scans, rejections, fills and hedges, exported as
//!   a text file for a node_exporter textfile collector

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;

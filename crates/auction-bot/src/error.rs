//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key error: {0}")]
    Key(#[from] auction_signer::KeyError),

    #[error("Chain error: {0}")]
    Chain(#[from] auction_chain::ChainError),

    #[error("Decode error: {0}")]
    Decode(#[from] auction_decoder::DecodeError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] auction_exchange::ExchangeError),

    #[error("Executor error: {0}")]
    Executor(#[from] auction_executor::ExecutorError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] auction_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] auction_telemetry::TelemetryError),

    #[error("Startup error: {0}")]
    Startup(String),
}

pub type AppResult<T> = Result<T, AppError>;

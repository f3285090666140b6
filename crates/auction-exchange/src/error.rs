//! Exchange error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(String),

    /// The envelope `desc` was not `success`.
    #[error("Exchange rejected request: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Order book for {0} is incomplete")]
    OrderbookNotComplete(String),

    #[error("No USD price for asset {0}")]
    AssetPriceNotFound(String),

    #[error("Order {0} was not filled")]
    NotFilled(String),

    #[error("Signer error: {0}")]
    Signer(#[from] auction_signer::SignerError),

    #[error("Amount error: {0}")]
    Core(#[from] auction_core::CoreError),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

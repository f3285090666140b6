//! Chain interface for the auction bidder.
//!
//! - `rpc`: JSON-RPC transport behind the `ChainRpc` trait
//! - `abi`: auction contract calldata and a word-oriented result reader
//! - `contract`: read calls and signed sends against the auction contract
//! - `receipt`: receipt model and the cancellable receipt wait
//! - `gas`: gas price hint with fallback
//! - `scheduler`: strictly increasing block height feed

pub mod abi;
pub mod contract;
pub mod error;
pub mod gas;
pub mod receipt;
pub mod rpc;
pub mod scheduler;

pub use abi::{AbiWords, WORD_LEN};
pub use contract::{AuctionContract, SendParams};
pub use error::{ChainError, ChainResult};
pub use gas::{FixedGasPrice, GasPriceSource, GasStationOracle};
pub use receipt::{wait_for_receipt, Log, Receipt};
pub use rpc::{BoxFuture, ChainRpc, HttpRpc, MockChainRpc};
pub use scheduler::{BlockScheduler, BlockTicks};

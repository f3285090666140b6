//! Settlement persistence for the auction bidder.
//!
//! Every fill attempt is appended to a daily JSON Lines file. Positions are
//! rebuilt from the ledger rather than stored separately.

pub mod error;
pub mod ledger;
pub mod position;

pub use error::{PersistenceError, PersistenceResult};
pub use ledger::SettlementLedger;
pub use position::{PositionBook, NATIVE_SYMBOL};

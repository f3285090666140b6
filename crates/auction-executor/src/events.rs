//! Fill event extraction from receipts.

use auction_chain::{AbiWords, ChainError, ChainResult, Receipt};
use alloy::primitives::{b256, B256, U256};

/// topic0 of the auction contract's fill event.
pub const FILL_AUCTION_TOPIC: B256 =
    b256!("42a553656a0da7239e70a4a3c864c1ac7d46d7968bfe2e1fb14f42dbb67135e8");

/// Data word holding the repaid debt.
const REPAID_DEBT_WORD: usize = 2;
/// Data word holding the collateral sent to the bidder.
const RECEIVED_COLLATERAL_WORD: usize = 3;

/// Raw amounts moved by a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEvent {
    pub repaid_debt: U256,
    pub received_collateral: U256,
}

impl FillEvent {
    /// Find and decode the fill event in `receipt`; `None` if it is absent.
    ///
    /// # Errors
    /// Returns `ChainError::InvalidResponse` if the event data is too short.
    pub fn from_receipt(receipt: &Receipt) -> ChainResult<Option<Self>> {
        let Some(log) = receipt.find_log(FILL_AUCTION_TOPIC) else {
            return Ok(None);
        };

        let words = AbiWords::from_bytes(log.data.to_vec())?;
        let field = |index: usize| {
            words.uint(index).ok_or_else(|| {
                ChainError::InvalidResponse(format!(
                    "fill event has {} data words, need {}",
                    words.len(),
                    RECEIVED_COLLATERAL_WORD + 1
                ))
            })
        };

        Ok(Some(Self {
            repaid_debt: field(REPAID_DEBT_WORD)?,
            received_collateral: field(RECEIVED_COLLATERAL_WORD)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes};
    use auction_chain::Log;

    fn event_data(words: &[U256]) -> Bytes {
        words
            .iter()
            .flat_map(|w| w.to_be_bytes::<32>())
            .collect::<Vec<u8>>()
            .into()
    }

    fn receipt(logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: B256::ZERO,
            block_number: 1,
            success: true,
            gas_used: 150_000,
            effective_gas_price: None,
            logs,
        }
    }

    #[test]
    fn test_extracts_amounts_from_words_two_and_three() {
        let data = event_data(&[
            U256::from(1u64),
            U256::from(2u64),
            U256::from(60_000_000u64),
            U256::from(24_000_000_000_000_000_000u128),
        ]);
        let other = Log {
            address: Address::ZERO,
            topics: vec![B256::repeat_byte(0x11)],
            data: Bytes::new(),
        };
        let fill = Log {
            address: Address::ZERO,
            topics: vec![FILL_AUCTION_TOPIC],
            data,
        };

        let event = FillEvent::from_receipt(&receipt(vec![other, fill]))
            .unwrap()
            .unwrap();
        assert_eq!(event.repaid_debt, U256::from(60_000_000u64));
        assert_eq!(
            event.received_collateral,
            U256::from(24_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_missing_event() {
        assert_eq!(FillEvent::from_receipt(&receipt(vec![])).unwrap(), None);
    }

    #[test]
    fn test_short_event_data_is_invalid() {
        let log = Log {
            address: Address::ZERO,
            topics: vec![FILL_AUCTION_TOPIC],
            data: event_data(&[U256::ZERO, U256::ZERO, U256::ZERO]),
        };
        assert!(matches!(
            FillEvent::from_receipt(&receipt(vec![log])),
            Err(ChainError::InvalidResponse(_))
        ));
    }
}

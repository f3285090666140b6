//! Auction contract ABI surface and a structured reader for call results.

use crate::error::{ChainError, ChainResult};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

/// Size of one ABI word.
pub const WORD_LEN: usize = 32;

sol! {
    /// Functions of the auction contract used by the bidder.
    #[derive(Debug)]
    interface IAuctionContract {
        function getCurrentAuctions() external view returns (uint32[] memory);
        function getAuctionDetails(uint32 auctionID) external view;
        function fillAuctionWithAmount(uint32 auctionID, uint256 repayAmount) external;
        function balanceOf(address asset, address user) external view returns (uint256);
    }
}

pub fn get_current_auctions_call() -> Bytes {
    IAuctionContract::getCurrentAuctionsCall {}.abi_encode().into()
}

pub fn get_auction_details_call(auction_id: u32) -> Bytes {
    IAuctionContract::getAuctionDetailsCall {
        auctionID: auction_id,
    }
    .abi_encode()
    .into()
}

pub fn fill_auction_with_amount_call(auction_id: u32, repay_amount: U256) -> Bytes {
    IAuctionContract::fillAuctionWithAmountCall {
        auctionID: auction_id,
        repayAmount: repay_amount,
    }
    .abi_encode()
    .into()
}

pub fn balance_of_call(asset: Address, user: Address) -> Bytes {
    IAuctionContract::balanceOfCall { asset, user }
        .abi_encode()
        .into()
}

// =============================================================================
// AbiWords
// =============================================================================

/// Raw ABI-encoded data viewed as a sequence of 32-byte words.
///
/// All offset arithmetic lives here; callers address fields by word index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiWords {
    bytes: Vec<u8>,
}

impl AbiWords {
    /// Decode a `0x`-prefixed hex payload.
    ///
    /// # Errors
    /// Returns `ChainError::InvalidResponse` on bad hex or a length that is not
    /// a whole number of words.
    pub fn from_hex(payload: &str) -> ChainResult<Self> {
        let digits = payload.strip_prefix("0x").unwrap_or(payload);
        let bytes = hex::decode(digits)
            .map_err(|e| ChainError::InvalidResponse(format!("bad hex payload: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> ChainResult<Self> {
        let bytes = bytes.into();
        if bytes.len() % WORD_LEN != 0 {
            return Err(ChainError::InvalidResponse(format!(
                "payload of {} bytes is not word aligned",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.bytes.len() / WORD_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn word(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(WORD_LEN)?;
        self.bytes.get(start..start.checked_add(WORD_LEN)?)
    }

    pub fn uint(&self, index: usize) -> Option<U256> {
        self.word(index).map(U256::from_be_slice)
    }

    /// Address stored in the low 20 bytes of a word.
    pub fn address(&self, index: usize) -> Option<Address> {
        self.word(index).map(|w| Address::from_slice(&w[12..]))
    }

    /// Word interpreted as a flag (non-zero = true).
    pub fn flag(&self, index: usize) -> Option<bool> {
        self.word(index).map(|w| w.iter().any(|b| *b != 0))
    }

    /// Word interpreted as a `u32`, rejecting values that do not fit.
    pub fn u32(&self, index: usize) -> Option<u32> {
        self.uint(index).and_then(|v| u32::try_from(v).ok())
    }
}

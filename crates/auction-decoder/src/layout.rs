//! Word layout of the `getAuctionDetails` result.
//!
//! The contract returns the auction struct as nine ABI words.

/// Borrower account (unused by the bidder).
pub const BORROWER: usize = 0;
/// Lending market id (unused by the bidder).
pub const MARKET_ID: usize = 1;
pub const DEBT_ASSET: usize = 2;
pub const COLLATERAL_ASSET: usize = 3;
/// Raw available debt, in debt asset units.
pub const DEBT: usize = 4;
/// Raw available collateral, in collateral asset units.
pub const COLLATERAL: usize = 5;
/// 18-decimal fixed point.
pub const RATIO: usize = 6;
/// Contract-side price (unused, recomputed from debt and collateral).
pub const PRICE: usize = 7;
pub const FINISHED: usize = 8;

pub const AUCTION_WORDS: usize = 9;

/// Hex length of a well-formed payload, `0x` prefix included.
pub const AUCTION_PAYLOAD_HEX_LEN: usize = 2 + AUCTION_WORDS * 64;

/// Decimal exponent of the ratio word.
pub const RATIO_DECIMALS: u32 = 18;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_length() {
        assert_eq!(AUCTION_PAYLOAD_HEX_LEN, 578);
        assert!(FINISHED < AUCTION_WORDS);
        assert!(BORROWER < MARKET_ID && MARKET_ID < DEBT_ASSET && PRICE < FINISHED);
    }
}

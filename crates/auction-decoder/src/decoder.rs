//! Auction payload decoding.

use crate::error::{DecodeError, DecodeResult};
use crate::layout;
use alloy::primitives::{Address, U256};
use auction_chain::{AbiWords, AuctionContract, WORD_LEN};
use auction_core::{to_decimal, Asset, Auction, MarketRegistry};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default debt growth correction (1.00001).
///
/// Approximates interest accrued between the read and the fill. The value is
/// an empirical constant and has not been derived from the lending model.
pub const DEFAULT_DEBT_GROWTH_FACTOR: Decimal = Decimal::from_parts(100_001, 0, 0, false, 5);

/// Decodes auction snapshots against the known assets and markets.
#[derive(Debug, Clone)]
pub struct AuctionDecoder {
    registry: Arc<MarketRegistry>,
    growth_factor: Decimal,
}

impl AuctionDecoder {
    pub fn new(registry: Arc<MarketRegistry>, growth_factor: Decimal) -> Self {
        Self {
            registry,
            growth_factor,
        }
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    /// Decode one `getAuctionDetails` result.
    ///
    /// # Errors
    /// - `MalformedAuctionData` if the payload is not exactly nine words
    /// - `UnknownAsset` if the debt or collateral address is not configured
    /// - `UnknownMarket` if neither `debt-collateral` nor `collateral-debt` is a market
    pub fn decode(&self, auction_id: u32, payload: &str) -> DecodeResult<Auction> {
        let digits = payload.strip_prefix("0x").unwrap_or(payload);
        if digits.len() + 2 != layout::AUCTION_PAYLOAD_HEX_LEN {
            return Err(DecodeError::MalformedAuctionData {
                auction_id,
                reason: format!(
                    "expected {} hex chars, got {}",
                    layout::AUCTION_PAYLOAD_HEX_LEN,
                    digits.len() + 2
                ),
            });
        }

        let words = AbiWords::from_hex(digits).map_err(|e| DecodeError::MalformedAuctionData {
            auction_id,
            reason: e.to_string(),
        })?;
        let reader = FieldReader { auction_id, words };

        let debt_asset = self.resolve_asset(auction_id, &reader, layout::DEBT_ASSET)?;
        let collateral_asset = self.resolve_asset(auction_id, &reader, layout::COLLATERAL_ASSET)?;

        let raw_debt = to_decimal(reader.uint(layout::DEBT)?, debt_asset.decimals)?;
        let debt = raw_debt * self.growth_factor;
        let collateral = to_decimal(reader.uint(layout::COLLATERAL)?, collateral_asset.decimals)?;
        let ratio = to_decimal(reader.uint(layout::RATIO)?, layout::RATIO_DECIMALS)?;
        let finished = reader.flag(layout::FINISHED)?;

        let market = self
            .registry
            .pair_for(&debt_asset.symbol, &collateral_asset.symbol)
            .ok_or_else(|| DecodeError::UnknownMarket {
                debt: debt_asset.symbol.clone(),
                collateral: collateral_asset.symbol.clone(),
            })?;

        let auction = Auction::new(
            auction_id,
            debt_asset.symbol.clone(),
            collateral_asset.symbol.clone(),
            market.id.clone(),
            debt,
            collateral,
            ratio,
            finished,
        );

        debug!(
            auction_id,
            debt = %auction.debt_symbol,
            collateral = %auction.collateral_symbol,
            available_debt = %auction.available_debt,
            available_collateral = %auction.available_collateral,
            ratio = %auction.ratio,
            finished = auction.finished,
            "Decoded auction"
        );
        Ok(auction)
    }

    /// List open auctions and decode each one, in chain order.
    ///
    /// Auctions whose details cannot be read or decoded are skipped with a
    /// warning; only a failure to list the auction ids is an error.
    pub async fn fetch_auctions(&self, contract: &AuctionContract) -> DecodeResult<Vec<Auction>> {
        let ids = decode_auction_ids(&contract.current_auctions().await?)?;
        let mut auctions = Vec::with_capacity(ids.len());

        for id in ids {
            let payload = match contract.auction_details(id).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(auction_id = id, error = %e, "Failed to read auction details, skipping");
                    continue;
                }
            };
            match self.decode(id, &payload) {
                Ok(auction) => auctions.push(auction),
                Err(e) => warn!(auction_id = id, error = %e, "Failed to decode auction, skipping"),
            }
        }

        Ok(auctions)
    }

    fn resolve_asset(
        &self,
        auction_id: u32,
        reader: &FieldReader,
        index: usize,
    ) -> DecodeResult<&Asset> {
        let address = reader.address(index)?;
        self.registry
            .asset_by_address(address)
            .ok_or(DecodeError::UnknownAsset {
                auction_id,
                address,
            })
    }
}

/// Length-checked word access tagged with the auction id for errors.
struct FieldReader {
    auction_id: u32,
    words: AbiWords,
}

impl FieldReader {
    fn missing(&self, index: usize) -> DecodeError {
        DecodeError::MalformedAuctionData {
            auction_id: self.auction_id,
            reason: format!("missing word {index}"),
        }
    }

    fn uint(&self, index: usize) -> DecodeResult<U256> {
        self.words.uint(index).ok_or_else(|| self.missing(index))
    }

    fn address(&self, index: usize) -> DecodeResult<Address> {
        self.words.address(index).ok_or_else(|| self.missing(index))
    }

    fn flag(&self, index: usize) -> DecodeResult<bool> {
        self.words.flag(index).ok_or_else(|| self.missing(index))
    }
}

/// Decode the `uint32[]` returned by `getCurrentAuctions()`.
///
/// An empty result means no open auctions.
pub fn decode_auction_ids(payload: &str) -> DecodeResult<Vec<u32>> {
    let words =
        AbiWords::from_hex(payload).map_err(|e| DecodeError::MalformedAuctionIds(e.to_string()))?;
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let offset = words
        .u32(0)
        .ok_or_else(|| DecodeError::MalformedAuctionIds("bad array offset".to_string()))?
        as usize;
    if offset % WORD_LEN != 0 {
        return Err(DecodeError::MalformedAuctionIds(format!(
            "array offset {offset} is not word aligned"
        )));
    }

    let length_index = offset / WORD_LEN;
    let count = words
        .u32(length_index)
        .ok_or_else(|| DecodeError::MalformedAuctionIds("missing array length".to_string()))?
        as usize;

    (0..count)
        .map(|i| {
            words
                .u32(length_index + 1 + i)
                .ok_or_else(|| DecodeError::MalformedAuctionIds(format!("missing element {i}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_chain::{abi, MockChainRpc};
    use auction_core::Market;
    use rust_decimal_macros::dec;

    const DAI: u8 = 0x0d;
    const ETH: u8 = 0x0e;
    const USDT: u8 = 0x07;

    fn asset(symbol: &str, byte: u8, decimals: u32) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            address: Address::repeat_byte(byte),
            decimals,
        }
    }

    fn registry() -> Arc<MarketRegistry> {
        Arc::new(MarketRegistry::from_markets(vec![Market {
            id: "ETH-DAI".to_string(),
            base: asset("ETH", ETH, 18),
            quote: asset("DAI", DAI, 18),
            price_precision: 5,
            price_decimals: 2,
            amount_decimals: 4,
            min_order_size: dec!(10),
        }]))
    }

    fn word(value: U256) -> String {
        hex::encode(value.to_be_bytes::<32>())
    }

    fn address_word(byte: u8) -> String {
        format!("{}{}", "00".repeat(12), hex::encode(Address::repeat_byte(byte)))
    }

    fn e18(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(18u64))
    }

    /// Payload with `debt` and `collateral` in whole tokens and `ratio` in hundredths.
    fn payload(
        debt_asset: u8,
        collateral_asset: u8,
        debt: u64,
        collateral: u64,
        ratio_pct: u64,
        finished: bool,
    ) -> String {
        let ratio = e18(ratio_pct) / U256::from(100u64);
        format!(
            "0x{}{}{}{}{}{}{}{}{}",
            address_word(0x99),
            word(U256::from(1u64)),
            address_word(debt_asset),
            address_word(collateral_asset),
            word(e18(debt)),
            word(e18(collateral)),
            word(ratio),
            word(U256::ZERO),
            word(U256::from(finished as u64)),
        )
    }

    fn decoder() -> AuctionDecoder {
        AuctionDecoder::new(registry(), Decimal::ONE)
    }

    #[test]
    fn test_decode_ratio_below_one() {
        let auction = decoder().decode(7, &payload(DAI, ETH, 100, 50, 80, false)).unwrap();

        assert_eq!(auction.id, 7);
        assert_eq!(auction.debt_symbol, "DAI");
        assert_eq!(auction.collateral_symbol, "ETH");
        assert_eq!(auction.trading_pair, "ETH-DAI");
        assert_eq!(auction.available_debt, dec!(100));
        assert_eq!(auction.available_collateral, dec!(40));
        assert_eq!(auction.price, dec!(2.5));
        assert!(!auction.finished);
    }

    #[test]
    fn test_decode_ratio_above_one_and_finished() {
        let auction = decoder().decode(8, &payload(DAI, ETH, 100, 50, 125, true)).unwrap();

        assert_eq!(auction.available_debt, dec!(80));
        assert_eq!(auction.available_collateral, dec!(50));
        assert!(auction.finished);
    }

    #[test]
    fn test_decode_applies_growth_factor() {
        let decoder = AuctionDecoder::new(registry(), DEFAULT_DEBT_GROWTH_FACTOR);
        let auction = decoder.decode(1, &payload(DAI, ETH, 100, 50, 100, false)).unwrap();
        assert_eq!(auction.available_debt, dec!(100.001));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let mut short = payload(DAI, ETH, 100, 50, 80, false);
        short.truncate(short.len() - 64);

        let err = decoder().decode(3, &short).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedAuctionData { auction_id: 3, .. }));
    }

    #[test]
    fn test_decode_unknown_asset() {
        let err = decoder().decode(4, &payload(USDT, ETH, 100, 50, 80, false)).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownAsset { auction_id: 4, .. }));
    }

    #[test]
    fn test_decode_unknown_market() {
        // Both assets known, but no market pairs ETH with itself.
        let err = decoder().decode(5, &payload(ETH, ETH, 100, 50, 80, false)).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownMarket { .. }));
    }

    fn id_list(ids: &[u32]) -> String {
        let mut out = format!("0x{}{}", word(U256::from(32u64)), word(U256::from(ids.len())));
        for id in ids {
            out.push_str(&word(U256::from(*id)));
        }
        out
    }

    #[test]
    fn test_decode_auction_ids() {
        assert_eq!(decode_auction_ids(&id_list(&[3, 9, 12])).unwrap(), vec![3, 9, 12]);
        assert!(decode_auction_ids(&id_list(&[])).unwrap().is_empty());
        assert!(decode_auction_ids("0x").unwrap().is_empty());
    }

    #[test]
    fn test_decode_auction_ids_truncated() {
        let mut payload = id_list(&[3, 9]);
        payload.truncate(payload.len() - 64);
        assert!(matches!(
            decode_auction_ids(&payload),
            Err(DecodeError::MalformedAuctionIds(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_auctions_skips_bad_entries() {
        let rpc = Arc::new(MockChainRpc::new());
        let contract = AuctionContract::new(rpc.clone(), Address::repeat_byte(0x24), 1);

        rpc.set_call_response(abi::get_current_auctions_call(), id_list(&[1, 2, 3]));
        rpc.set_call_response(abi::get_auction_details_call(1), payload(DAI, ETH, 100, 50, 80, false));
        rpc.set_call_response(abi::get_auction_details_call(2), payload(USDT, ETH, 100, 50, 80, false));
        // Auction 3 has no scripted response: the read fails.

        let auctions = decoder().fetch_auctions(&contract).await.unwrap();
        assert_eq!(auctions.len(), 1);
        assert_eq!(auctions[0].id, 1);
    }
}

//! REST request and response shapes.
//!
//! Every response is wrapped in `{status, desc, data}`; anything other than
//! `desc == "success"` is an error regardless of HTTP status.

use crate::book::{OrderBook, PriceLevel};
use crate::error::{ExchangeError, ExchangeResult};
use alloy::primitives::{Address, U256};
use auction_core::{Asset, Market, OrderResult, OrderSide, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

const SUCCESS: &str = "success";

/// Response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: i64,
    pub desc: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Check `desc` only; for endpoints without a payload.
    pub fn check(self) -> ExchangeResult<()> {
        if self.desc == SUCCESS {
            Ok(())
        } else {
            Err(ExchangeError::Api(self.desc))
        }
    }

    /// Unwrap the payload of a successful response.
    pub fn into_data(self) -> ExchangeResult<T> {
        if self.desc != SUCCESS {
            return Err(ExchangeError::Api(self.desc));
        }
        self.data
            .ok_or_else(|| ExchangeError::Parse("successful response without data".to_string()))
    }
}

/// Decimal that may arrive as a string, a number, an empty string or null.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(Decimal::ZERO),
        serde_json::Value::String(s) if s.is_empty() => Ok(Decimal::ZERO),
        serde_json::Value::String(s) => Decimal::from_str(&s).map_err(serde::de::Error::custom),
        serde_json::Value::Number(n) => {
            Decimal::from_str(&n.to_string()).map_err(serde::de::Error::custom)
        }
        other => Err(serde::de::Error::custom(format!("expected decimal, got {other}"))),
    }
}

/// Raw integer amount that may arrive as a decimal or exponent string, a
/// number, an empty string or null. Any fractional part is truncated.
fn lenient_raw_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(U256::ZERO),
        serde_json::Value::String(s) => parse_raw_amount(&s).map_err(serde::de::Error::custom),
        serde_json::Value::Number(n) => {
            parse_raw_amount(&n.to_string()).map_err(serde::de::Error::custom)
        }
        other => Err(serde::de::Error::custom(format!("expected amount, got {other}"))),
    }
}

/// Largest number of decimal digits a `U256` can hold.
const MAX_RAW_DIGITS: usize = 78;

fn parse_raw_amount(value: &str) -> Result<U256, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(U256::ZERO);
    }

    let (mantissa, exponent) = match value.split_once(|c: char| c == 'e' || c == 'E') {
        Some((mantissa, exponent)) => (
            mantissa,
            exponent
                .parse::<i64>()
                .map_err(|e| format!("amount {value}: {e}"))?,
        ),
        None => (value, 0),
    };
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{integer}{fraction}");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("amount {value}: not an unsigned number"));
    }

    // Digits left of the decimal point once the exponent is applied.
    let whole = i64::try_from(integer.len())
        .ok()
        .and_then(|len| len.checked_add(exponent))
        .ok_or_else(|| format!("amount {value}: exponent out of range"))?;
    if whole <= 0 {
        return Ok(U256::ZERO);
    }
    let whole = usize::try_from(whole).map_err(|e| format!("amount {value}: {e}"))?;
    if whole > digits.len() + MAX_RAW_DIGITS {
        return Err(format!("amount {value}: too large"));
    }

    let integer_digits = if whole >= digits.len() {
        format!("{digits}{}", "0".repeat(whole - digits.len()))
    } else {
        digits[..whole].to_string()
    };
    U256::from_str_radix(&integer_digits, 10).map_err(|e| format!("amount {value}: {e}"))
}

fn parse_address(value: &str) -> ExchangeResult<Address> {
    Address::from_str(value).map_err(|e| ExchangeError::Parse(format!("address {value}: {e}")))
}

// =============================================================================
// Markets
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MarketsData {
    pub markets: Vec<WireMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMarket {
    pub id: String,
    pub base_asset_name: String,
    pub base_asset_address: String,
    pub base_asset_decimals: u32,
    pub quote_asset_name: String,
    pub quote_asset_address: String,
    pub quote_asset_decimals: u32,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub min_order_size: Decimal,
    pub price_precision: u32,
    pub price_decimals: u32,
    pub amount_decimals: u32,
}

impl TryFrom<WireMarket> for Market {
    type Error = ExchangeError;

    fn try_from(wire: WireMarket) -> ExchangeResult<Self> {
        let base = Asset {
            address: parse_address(&wire.base_asset_address)?,
            symbol: wire.base_asset_name,
            decimals: wire.base_asset_decimals,
        };
        let quote = Asset {
            address: parse_address(&wire.quote_asset_address)?,
            symbol: wire.quote_asset_name,
            decimals: wire.quote_asset_decimals,
        };
        Ok(Market {
            id: format!("{}-{}", base.symbol, quote.symbol),
            base,
            quote,
            price_precision: wire.price_precision,
            price_decimals: wire.price_decimals,
            amount_decimals: wire.amount_decimals,
            min_order_size: wire.min_order_size,
        })
    }
}

// =============================================================================
// Balances and prices
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedBalancesData {
    pub locked_balances: Vec<WireLockedBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLockedBalance {
    pub symbol: String,
    #[serde(default)]
    pub wallet_type: String,
    /// Raw integer amount.
    #[serde(deserialize_with = "lenient_raw_amount", default)]
    pub amount: U256,
}

/// Amount reserved by open orders, in raw asset units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedBalance {
    pub symbol: String,
    pub raw_amount: U256,
}

/// Wallet whose locks reduce the free trading balance.
pub const TRADING_WALLET: &str = "trading";

impl From<WireLockedBalance> for LockedBalance {
    fn from(wire: WireLockedBalance) -> Self {
        Self {
            symbol: wire.symbol,
            raw_amount: wire.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssetsData {
    pub assets: Vec<WireAsset>,
}

#[derive(Debug, Deserialize)]
pub struct WireAsset {
    pub symbol: String,
    #[serde(rename = "oracleUSDPrice", deserialize_with = "lenient_decimal", default)]
    pub oracle_usd_price: Decimal,
}

// =============================================================================
// Order book
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookData {
    pub order_book: WireOrderBook,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderBook {
    #[serde(default)]
    pub market_id: String,
    #[serde(default)]
    pub bids: Vec<WireLevel>,
    #[serde(default)]
    pub asks: Vec<WireLevel>,
}

#[derive(Debug, Deserialize)]
pub struct WireLevel {
    #[serde(deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
}

impl From<WireOrderBook> for OrderBook {
    fn from(wire: WireOrderBook) -> Self {
        let levels = |levels: Vec<WireLevel>| {
            levels
                .into_iter()
                .map(|l| PriceLevel::new(l.price, l.amount))
                .collect()
        };
        Self {
            market_id: wire.market_id,
            bids: levels(wire.bids),
            asks: levels(wire.asks),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOrderRequest<'a> {
    pub market_id: &'a str,
    pub side: OrderSide,
    pub order_type: &'static str,
    pub price: Decimal,
    pub amount: Decimal,
    pub expires: u64,
    pub is_maker_only: bool,
    pub wallet_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct BuildOrderData {
    pub order: WireOrderId,
}

#[derive(Debug, Deserialize)]
pub struct WireOrderId {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest<'a> {
    pub order_id: &'a str,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub order: WireOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    pub id: String,
    #[serde(default)]
    pub side: String,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub price: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub available_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub pending_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub confirmed_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub average_price: Decimal,
}

impl From<WireOrder> for OrderResult {
    fn from(wire: WireOrder) -> Self {
        let status = if wire.available_amount.is_zero() {
            OrderStatus::Closed
        } else {
            OrderStatus::Open
        };
        let side = if wire.side == "sell" {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        Self {
            id: wire.id,
            status,
            side,
            price: wire.price,
            amount: wire.amount,
            filled_amount: wire.pending_amount + wire.confirmed_amount,
            average_price: wire.average_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_error_desc() {
        let envelope: Envelope<OrderData> =
            serde_json::from_str(r#"{"status": -1, "desc": "insufficient balance"}"#).unwrap();
        match envelope.into_data() {
            Err(ExchangeError::Api(desc)) => assert_eq!(desc, "insufficient balance"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_market() {
        let json = r#"{"status":0,"desc":"success","data":{"markets":[{
            "id":"ETH-DAI","baseAsset":"ETH","baseAssetName":"ETH","baseAssetDecimals":18,
            "baseAssetAddress":"0x000000000000000000000000000000000000000e",
            "quoteAsset":"DAI","quoteAssetName":"DAI","quoteAssetDecimals":18,
            "quoteAssetAddress":"0x89d24a6b4ccb1b6faa2625fe562bdd9a23260359",
            "minOrderSize":"0.1","pricePrecision":5,"priceDecimals":2,"amountDecimals":3
        }]}}"#;
        let envelope: Envelope<MarketsData> = serde_json::from_str(json).unwrap();
        let wire = envelope.into_data().unwrap().markets.remove(0);
        let market = Market::try_from(wire).unwrap();

        assert_eq!(market.id, "ETH-DAI");
        assert_eq!(market.base.decimals, 18);
        assert_eq!(
            market.quote.address,
            "0x89d24a6b4ccb1b6faa2625fe562bdd9a23260359".parse::<Address>().unwrap()
        );
        assert_eq!(market.min_order_size, dec!(0.1));
    }

    #[test]
    fn test_parse_order_status_and_filled_amount() {
        let json = r#"{"order":{"id":"0xabc","side":"sell","price":"180","amount":"2",
            "availableAmount":"0","pendingAmount":"0.5","confirmedAmount":"1.5",
            "averagePrice":"181.2"}}"#;
        let data: OrderData = serde_json::from_str(json).unwrap();
        let order = OrderResult::from(data.order);

        assert!(order.is_closed());
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.filled_amount, dec!(2));
        assert_eq!(order.average_price, dec!(181.2));
    }

    #[test]
    fn test_open_order_with_empty_average_price() {
        let json = r#"{"order":{"id":"0xdef","side":"buy","availableAmount":"3","averagePrice":""}}"#;
        let data: OrderData = serde_json::from_str(json).unwrap();
        let order = OrderResult::from(data.order);

        assert!(!order.is_closed());
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.average_price, Decimal::ZERO);
    }

    #[test]
    fn test_build_order_request_serialization() {
        let request = BuildOrderRequest {
            market_id: "ETH-DAI",
            side: OrderSide::Sell,
            order_type: "market",
            price: dec!(171),
            amount: dec!(2.5),
            expires: 3600,
            is_maker_only: false,
            wallet_type: TRADING_WALLET,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["marketId"], "ETH-DAI");
        assert_eq!(value["side"], "sell");
        assert_eq!(value["price"], "171");
        assert_eq!(value["walletType"], "trading");
    }

    #[test]
    fn test_locked_balance_raw_amount() {
        let wire: WireLockedBalance = serde_json::from_str(
            r#"{"symbol":"DAI","walletType":"trading","amount":"1500000000000000000"}"#,
        )
        .unwrap();
        let locked = LockedBalance::from(wire);
        assert_eq!(locked.raw_amount, U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn test_locked_balance_lenient_amounts() {
        let parse = |amount: &str| {
            let json = format!(r#"{{"symbol":"DAI","walletType":"trading","amount":{amount}}}"#);
            serde_json::from_str::<WireLockedBalance>(&json).map(|w| w.amount)
        };
        let expected = U256::from(1_500_000_000_000_000_000u64);

        assert_eq!(parse(r#""1500000000000000000.0""#).unwrap(), expected);
        assert_eq!(parse(r#""1500000000000000000.999""#).unwrap(), expected);
        assert_eq!(parse(r#""1.5e18""#).unwrap(), expected);
        assert_eq!(parse("1500000000000000000").unwrap(), expected);
        assert_eq!(parse(r#""0.4""#).unwrap(), U256::ZERO);
        assert_eq!(parse(r#""""#).unwrap(), U256::ZERO);
        assert_eq!(parse("null").unwrap(), U256::ZERO);

        assert!(parse(r#""-1""#).is_err());
        assert!(parse(r#""abc""#).is_err());
        assert!(parse(r#""1e100""#).is_err());
    }
}

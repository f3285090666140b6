//! Exchange REST client.
//!
//! Every request carries the `Hydro-Authentication` header from the shared
//! `AuthTokenCache`. Market orders are built, the returned order id is
//! personal-signed, and the order is placed synchronously so the fill is
//! known when the call returns.

use crate::book::{BookLevel, OrderBook};
use crate::error::{ExchangeError, ExchangeResult};
use crate::precision::{order_amount, order_price};
use crate::wire::{
    AssetsData, BuildOrderData, BuildOrderRequest, Envelope, LockedBalance, LockedBalancesData,
    MarketsData, OrderBookData, OrderData, PlaceOrderRequest, TRADING_WALLET,
};
use auction_core::{Market, OrderResult, OrderSide};
use auction_signer::{AuthTokenCache, AUTH_HEADER};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default timeout for REST requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Market order lifetime in seconds.
const MARKET_ORDER_EXPIRES: u64 = 3600;

/// Exchange operations used by the bidder.
pub trait Exchange: Send + Sync {
    /// All listed markets.
    fn markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>>;

    /// Amounts locked by open orders in the trading wallet.
    fn locked_balances(&self) -> BoxFuture<'_, ExchangeResult<Vec<LockedBalance>>>;

    fn order_book<'a>(
        &'a self,
        market_id: &'a str,
        level: BookLevel,
    ) -> BoxFuture<'a, ExchangeResult<OrderBook>>;

    /// Oracle USD price of `symbol`.
    fn asset_usd_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<Decimal>>;

    /// Place a market order bounded by `price_limit`, returning the synchronous result.
    ///
    /// Price and amount are truncated to the market's constraints first.
    fn create_market_order<'a>(
        &'a self,
        market: &'a Market,
        side: OrderSide,
        price_limit: Decimal,
        amount: Decimal,
    ) -> BoxFuture<'a, ExchangeResult<OrderResult>>;

    fn get_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<OrderResult>>;

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>>;

    /// Cancel every open order on `market_id`.
    fn cancel_all_orders<'a>(&'a self, market_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>>;
}

/// HTTP implementation of `Exchange`.
pub struct ExchangeClient {
    client: Client,
    base_url: String,
    auth: Arc<AuthTokenCache>,
}

impl ExchangeClient {
    /// Create a new exchange client.
    ///
    /// # Arguments
    /// * `base_url` - REST root (e.g., "https://api.ddex.io/v3/")
    /// * `auth` - Token cache of the bot's identity
    pub fn new(base_url: impl Into<String>, auth: Arc<AuthTokenCache>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach auth, send, and unwrap the envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> ExchangeResult<Envelope<T>> {
        let token = self.auth.token()?;
        let response = request
            .header(AUTH_HEADER, token)
            .send()
            .await
            .map_err(|e| ExchangeError::Http(format!("{what} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Http(format!("{what} HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("{what}: {e}")))
    }

    async fn build_order(
        &self,
        market: &Market,
        side: OrderSide,
        price: Decimal,
        amount: Decimal,
    ) -> ExchangeResult<String> {
        let body = BuildOrderRequest {
            market_id: &market.id,
            side,
            order_type: "market",
            price,
            amount,
            expires: MARKET_ORDER_EXPIRES,
            is_maker_only: false,
            wallet_type: TRADING_WALLET,
        };
        let data: BuildOrderData = self
            .send(self.client.post(self.url("orders/build")).json(&body), "orders/build")
            .await?
            .into_data()?;
        Ok(data.order.id)
    }

    async fn place_order_sync(&self, order_id: &str) -> ExchangeResult<OrderResult> {
        let body = PlaceOrderRequest {
            order_id,
            signature: self.sign_order_id(order_id)?,
        };
        let data: OrderData = self
            .send(self.client.post(self.url("orders/sync")).json(&body), "orders/sync")
            .await?
            .into_data()?;
        Ok(data.order.into())
    }

    /// Personal signature over the raw bytes of a hex order id.
    fn sign_order_id(&self, order_id: &str) -> ExchangeResult<String> {
        let bytes = hex::decode(order_id.trim_start_matches("0x"))
            .map_err(|e| ExchangeError::Parse(format!("order id {order_id}: {e}")))?;
        Ok(self.auth.sign_message(&bytes)?)
    }
}

impl Exchange for ExchangeClient {
    fn markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>> {
        Box::pin(async move {
            let data: MarketsData = self
                .send(self.client.get(self.url("markets")), "markets")
                .await?
                .into_data()?;
            let markets = data
                .markets
                .into_iter()
                .map(Market::try_from)
                .collect::<ExchangeResult<Vec<_>>>()?;
            info!(count = markets.len(), "Fetched exchange markets");
            Ok(markets)
        })
    }

    fn locked_balances(&self) -> BoxFuture<'_, ExchangeResult<Vec<LockedBalance>>> {
        Box::pin(async move {
            let data: LockedBalancesData = self
                .send(
                    self.client.get(self.url("account/lockedBalances")),
                    "account/lockedBalances",
                )
                .await?
                .into_data()?;
            Ok(data
                .locked_balances
                .into_iter()
                .filter(|b| b.wallet_type == TRADING_WALLET)
                .map(LockedBalance::from)
                .collect())
        })
    }

    fn order_book<'a>(
        &'a self,
        market_id: &'a str,
        level: BookLevel,
    ) -> BoxFuture<'a, ExchangeResult<OrderBook>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url(&format!("markets/{market_id}/orderbook")))
                .query(&[("level", level.as_query())]);
            let data: OrderBookData = self.send(request, "orderbook").await?.into_data()?;
            let mut book = OrderBook::from(data.order_book);
            if book.market_id.is_empty() {
                book.market_id = market_id.to_string();
            }
            Ok(book)
        })
    }

    fn asset_usd_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<Decimal>> {
        Box::pin(async move {
            let data: AssetsData = self
                .send(self.client.get(self.url("assets")), "assets")
                .await?
                .into_data()?;
            data.assets
                .into_iter()
                .find(|a| a.symbol == symbol)
                .map(|a| a.oracle_usd_price)
                .filter(|price| *price > Decimal::ZERO)
                .ok_or_else(|| ExchangeError::AssetPriceNotFound(symbol.to_string()))
        })
    }

    fn create_market_order<'a>(
        &'a self,
        market: &'a Market,
        side: OrderSide,
        price_limit: Decimal,
        amount: Decimal,
    ) -> BoxFuture<'a, ExchangeResult<OrderResult>> {
        Box::pin(async move {
            let price = order_price(market, price_limit);
            let amount = order_amount(market, amount);
            let order_id = self.build_order(market, side, price, amount).await?;
            let result = self.place_order_sync(&order_id).await?;
            debug!(
                market = %market.id,
                %side,
                %price,
                %amount,
                order_id = %result.id,
                filled = %result.filled_amount,
                "Market order placed"
            );
            Ok(result)
        })
    }

    fn get_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<OrderResult>> {
        Box::pin(async move {
            let data: OrderData = self
                .send(self.client.get(self.url(&format!("orders/{order_id}"))), "orders")
                .await?
                .into_data()?;
            Ok(data.order.into())
        })
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            self.send::<IgnoredAny>(
                self.client.delete(self.url(&format!("orders/{order_id}"))),
                "cancel order",
            )
            .await?
            .check()?;
            info!(%order_id, "Cancelled order");
            Ok(())
        })
    }

    fn cancel_all_orders<'a>(&'a self, market_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let request = self
                .client
                .delete(self.url("orders"))
                .query(&[("marketId", market_id)]);
            self.send::<IgnoredAny>(request, "cancel all orders")
                .await?
                .check()?;
            info!(market = %market_id, "Cancelled all pending orders");
            Ok(())
        })
    }
}

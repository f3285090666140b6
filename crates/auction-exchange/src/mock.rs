//! In-memory exchange for testing.

use crate::book::{BookLevel, OrderBook};
use crate::client::{BoxFuture, Exchange};
use crate::error::{ExchangeError, ExchangeResult};
use crate::precision::{order_amount, order_price};
use crate::wire::LockedBalance;
use auction_core::{Market, OrderResult, OrderSide, OrderStatus};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A market order as received by the mock, after truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub market_id: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Scripted exchange.
///
/// Market orders fill completely at the configured fill price for the market
/// (or at the limit price when none is set). `fail_next_orders(n)` makes the
/// next `n` order attempts fail with a transport error, and
/// `set_partial_fills(ratio, n)` leaves the next `n` orders open with only
/// `ratio` of their amount filled. Cancelling an open order closes it.
#[derive(Debug, Default)]
pub struct MockExchange {
    markets: Mutex<Vec<Market>>,
    locked: Mutex<Vec<LockedBalance>>,
    books: Mutex<HashMap<String, OrderBook>>,
    usd_prices: Mutex<HashMap<String, Decimal>>,
    fill_prices: Mutex<HashMap<String, Decimal>>,
    pending_failures: AtomicU64,
    partial_fill_ratio: Mutex<Decimal>,
    pending_partial_fills: AtomicU64,
    order_attempts: AtomicU64,
    placed: Mutex<Vec<PlacedOrder>>,
    orders: Mutex<HashMap<String, OrderResult>>,
    cancelled_orders: Mutex<Vec<String>>,
    cancelled_markets: Mutex<Vec<String>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.lock() = markets;
    }

    pub fn set_locked_balances(&self, locked: Vec<LockedBalance>) {
        *self.locked.lock() = locked;
    }

    pub fn set_order_book(&self, book: OrderBook) {
        self.books.lock().insert(book.market_id.clone(), book);
    }

    pub fn set_usd_price(&self, symbol: &str, price: Decimal) {
        self.usd_prices.lock().insert(symbol.to_string(), price);
    }

    pub fn set_fill_price(&self, market_id: &str, price: Decimal) {
        self.fill_prices.lock().insert(market_id.to_string(), price);
    }

    pub fn fail_next_orders(&self, count: u64) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_partial_fills(&self, ratio: Decimal, count: u64) {
        *self.partial_fill_ratio.lock() = ratio;
        self.pending_partial_fills.store(count, Ordering::SeqCst);
    }

    pub fn order_attempts(&self) -> u64 {
        self.order_attempts.load(Ordering::SeqCst)
    }

    pub fn placed_orders(&self) -> Vec<PlacedOrder> {
        self.placed.lock().clone()
    }

    pub fn cancelled_orders(&self) -> Vec<String> {
        self.cancelled_orders.lock().clone()
    }

    pub fn cancelled_markets(&self) -> Vec<String> {
        self.cancelled_markets.lock().clone()
    }
}

impl Exchange for MockExchange {
    fn markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>> {
        Box::pin(async move { Ok(self.markets.lock().clone()) })
    }

    fn locked_balances(&self) -> BoxFuture<'_, ExchangeResult<Vec<LockedBalance>>> {
        Box::pin(async move { Ok(self.locked.lock().clone()) })
    }

    fn order_book<'a>(
        &'a self,
        market_id: &'a str,
        level: BookLevel,
    ) -> BoxFuture<'a, ExchangeResult<OrderBook>> {
        Box::pin(async move {
            let book = self
                .books
                .lock()
                .get(market_id)
                .cloned()
                .ok_or_else(|| ExchangeError::OrderbookNotComplete(market_id.to_string()))?;
            Ok(match level {
                BookLevel::Top => book.top(),
                BookLevel::Aggregated => book,
            })
        })
    }

    fn asset_usd_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<Decimal>> {
        Box::pin(async move {
            self.usd_prices
                .lock()
                .get(symbol)
                .copied()
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
            let attempt = self.order_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = self.pending_failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.pending_failures.store(pending - 1, Ordering::SeqCst);
                return Err(ExchangeError::Http("scripted failure".to_string()));
            }

            let price = order_price(market, price_limit);
            let amount = order_amount(market, amount);
            let average_price = self
                .fill_prices
                .lock()
                .get(&market.id)
                .copied()
                .unwrap_or(price);

            self.placed.lock().push(PlacedOrder {
                market_id: market.id.clone(),
                side,
                price,
                amount,
            });

            let partial = self.pending_partial_fills.load(Ordering::SeqCst);
            let (status, filled_amount) = if partial > 0 {
                self.pending_partial_fills.store(partial - 1, Ordering::SeqCst);
                let ratio = *self.partial_fill_ratio.lock();
                (OrderStatus::Open, order_amount(market, amount * ratio))
            } else {
                (OrderStatus::Closed, amount)
            };

            let result = OrderResult {
                id: format!("0x{attempt:064x}"),
                status,
                side,
                price,
                amount,
                filled_amount,
                average_price,
            };
            self.orders.lock().insert(result.id.clone(), result.clone());
            Ok(result)
        })
    }

    fn get_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<OrderResult>> {
        Box::pin(async move {
            self.orders
                .lock()
                .get(order_id)
                .cloned()
                .ok_or_else(|| ExchangeError::Api("order not found".to_string()))
        })
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let mut orders = self.orders.lock();
            let order = orders
                .get_mut(order_id)
                .ok_or_else(|| ExchangeError::Api("order not found".to_string()))?;
            if order.is_closed() {
                return Err(ExchangeError::Api("order already closed".to_string()));
            }
            order.status = OrderStatus::Closed;
            self.cancelled_orders.lock().push(order_id.to_string());
            Ok(())
        })
    }

    fn cancel_all_orders<'a>(&'a self, market_id: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            self.cancelled_markets.lock().push(market_id.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use auction_core::Asset;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        let asset = |symbol: &str| Asset {
            symbol: symbol.to_string(),
            address: Address::ZERO,
            decimals: 18,
        };
        Market {
            id: "ETH-DAI".to_string(),
            base: asset("ETH"),
            quote: asset("DAI"),
            price_precision: 5,
            price_decimals: 2,
            amount_decimals: 4,
            min_order_size: dec!(1),
        }
    }

    #[tokio::test]
    async fn test_partial_fill_stays_open_until_cancelled() {
        let exchange = MockExchange::new();
        exchange.set_partial_fills(dec!(0.25), 1);
        let market = market();

        let order = exchange
            .create_market_order(&market, OrderSide::Sell, dec!(190), dec!(2))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.filled_amount, dec!(0.5));
        assert_eq!(exchange.get_order(&order.id).await.unwrap(), order);

        exchange.cancel_order(&order.id).await.unwrap();
        let cancelled = exchange.get_order(&order.id).await.unwrap();
        assert!(cancelled.is_closed());
        assert_eq!(cancelled.filled_amount, dec!(0.5));
        assert_eq!(exchange.cancelled_orders(), vec![order.id.clone()]);

        // Closed orders cannot be cancelled again.
        assert!(matches!(
            exchange.cancel_order(&order.id).await,
            Err(ExchangeError::Api(_))
        ));

        let next = exchange
            .create_market_order(&market, OrderSide::Sell, dec!(190), dec!(2))
            .await
            .unwrap();
        assert!(next.is_closed());
        assert_eq!(next.filled_amount, dec!(2));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let exchange = MockExchange::new();
        assert!(matches!(
            exchange.get_order("0x01").await,
            Err(ExchangeError::Api(_))
        ));
        assert!(matches!(
            exchange.cancel_order("0x01").await,
            Err(ExchangeError::Api(_))
        ));
    }
}

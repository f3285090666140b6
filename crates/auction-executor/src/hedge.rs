//! Collateral hedging.
//!
//! Collateral received from a fill is sold for the debt asset with a
//! slippage-bounded market order. An order the exchange leaves open is
//! cancelled and the unfilled rest is hedged again. The hedge is retried
//! until everything is sold; only shutdown interrupts it.

use crate::error::{ExecutorError, ExecutorResult};
use auction_core::{Market, OrderSide, NULL_HASH};
use auction_exchange::{order_amount, BookLevel, Exchange, ExchangeError};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct HedgeConfig {
    /// Adverse deviation from the mid price accepted by the order.
    pub max_slippage: Decimal,
    pub retry_interval: Duration,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            max_slippage: Decimal::new(5, 2),
            retry_interval: Duration::from_secs(1),
        }
    }
}

/// Result of a hedge, summed over every order it placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedgeOutcome {
    /// Last order that filled.
    pub order_id: String,
    /// Collateral actually sold.
    pub sell_collateral: Decimal,
    /// Debt asset received.
    pub receive_debt: Decimal,
    /// Order attempts including the successful ones.
    pub attempts: u64,
    /// `false` when shutdown stopped the hedge with collateral left unsold.
    pub complete: bool,
}

/// What one order sold.
struct HedgeFill {
    order_id: String,
    sold: Decimal,
    received: Decimal,
}

pub struct HedgeExecutor {
    exchange: Arc<dyn Exchange>,
    config: HedgeConfig,
}

impl HedgeExecutor {
    pub fn new(exchange: Arc<dyn Exchange>, config: HedgeConfig) -> Self {
        Self { exchange, config }
    }

    /// Sell `amount` of `collateral` on `market`, retrying until it fills.
    ///
    /// If shutdown arrives after part of the amount was sold, the partial
    /// outcome is returned with `complete == false`.
    ///
    /// # Errors
    /// Returns `ExecutorError::Cancelled` if `cancel` fires before anything sold.
    pub async fn hedge(
        &self,
        market: &Market,
        collateral: &str,
        amount: Decimal,
        cancel: &CancellationToken,
    ) -> ExecutorResult<HedgeOutcome> {
        let mut outcome = HedgeOutcome {
            order_id: NULL_HASH.to_string(),
            sell_collateral: Decimal::ZERO,
            receive_debt: Decimal::ZERO,
            attempts: 0,
            complete: false,
        };
        let mut remaining = amount;

        loop {
            outcome.attempts += 1;
            match self.try_hedge(market, collateral, remaining).await {
                Ok(fill) => {
                    outcome.order_id = fill.order_id;
                    outcome.sell_collateral += fill.sold;
                    outcome.receive_debt += fill.received;
                    remaining -= fill.sold;

                    if order_amount(market, remaining).is_zero() {
                        outcome.complete = true;
                        info!(
                            market = %market.id,
                            %collateral,
                            order_id = %outcome.order_id,
                            sold = %outcome.sell_collateral,
                            received = %outcome.receive_debt,
                            attempts = outcome.attempts,
                            "Hedge filled"
                        );
                        return Ok(outcome);
                    }
                    info!(
                        market = %market.id,
                        %collateral,
                        sold = %fill.sold,
                        %remaining,
                        "Hedge partially filled, hedging the rest"
                    );
                }
                Err(e) => warn!(
                    market = %market.id,
                    %collateral,
                    %remaining,
                    attempt = outcome.attempts,
                    error = %e,
                    "Hedge attempt failed, retrying"
                ),
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.retry_interval) => {}
                () = cancel.cancelled() => {
                    warn!(
                        market = %market.id,
                        %collateral,
                        sold = %outcome.sell_collateral,
                        %remaining,
                        attempts = outcome.attempts,
                        "Hedge abandoned on shutdown"
                    );
                    if outcome.sell_collateral.is_zero() {
                        return Err(ExecutorError::Cancelled);
                    }
                    return Ok(outcome);
                }
            }
        }
    }

    async fn try_hedge(
        &self,
        market: &Market,
        collateral: &str,
        amount: Decimal,
    ) -> ExecutorResult<HedgeFill> {
        let book = self.exchange.order_book(&market.id, BookLevel::Top).await?;
        let mid = book
            .mid_price()
            .ok_or_else(|| ExchangeError::OrderbookNotComplete(market.id.clone()))?;

        let (side, price_limit) = hedge_order(market, collateral, mid, self.config.max_slippage);
        debug!(market = %market.id, %side, %mid, %price_limit, %amount, "Placing hedge order");

        let mut order = self
            .exchange
            .create_market_order(market, side, price_limit, amount)
            .await?;

        if !order.is_closed() {
            debug!(
                order_id = %order.id,
                filled = %order.filled_amount,
                "Hedge order left open, cancelling"
            );
            if let Err(e) = self.exchange.cancel_order(&order.id).await {
                warn!(order_id = %order.id, error = %e, "Failed to cancel open hedge order");
            }
            match self.exchange.get_order(&order.id).await {
                Ok(latest) => order = latest,
                Err(e) => warn!(
                    order_id = %order.id,
                    error = %e,
                    "Failed to refresh hedge order, using placement result"
                ),
            }
        }

        if order.filled_amount.is_zero() || order.average_price.is_zero() {
            return Err(ExchangeError::NotFilled(order.id).into());
        }

        // Market buys are sized in the quote asset, so the filled amount is
        // collateral on both sides.
        let received = match side {
            OrderSide::Sell => order.filled_amount * order.average_price,
            OrderSide::Buy => order.filled_amount / order.average_price,
        };

        Ok(HedgeFill {
            order_id: order.id,
            sold: order.filled_amount,
            received,
        })
    }
}

/// Side and limit price for selling `collateral` on `market`.
///
/// Base collateral is sold below mid; quote collateral buys the base above mid.
pub fn hedge_order(
    market: &Market,
    collateral: &str,
    mid: Decimal,
    max_slippage: Decimal,
) -> (OrderSide, Decimal) {
    if market.is_base(collateral) {
        (OrderSide::Sell, mid * (Decimal::ONE - max_slippage))
    } else {
        (OrderSide::Buy, mid * (Decimal::ONE + max_slippage))
    }
}

//! Order book depth walk for the hedge sale.

use crate::error::{Rejection, StrategyResult};
use auction_core::Market;
use auction_exchange::OrderBook;
use rust_decimal::Decimal;

/// Amount of the other asset received by selling `pay_amount` of `asset`
/// into `book`.
///
/// Selling the quote asset buys base from the asks; selling the base asset
/// sells into the bids. Levels are consumed best-first until the amount is
/// covered.
///
/// # Errors
/// Returns `Rejection::DepthNotEnough` if the book runs out first.
pub fn sell_receive_amount(
    book: &OrderBook,
    market: &Market,
    asset: &str,
    pay_amount: Decimal,
) -> StrategyResult<Decimal> {
    let mut remaining = pay_amount;
    let mut receive = Decimal::ZERO;

    if market.quote.symbol == asset {
        for ask in &book.asks {
            let level_value = ask.price * ask.amount;
            if level_value >= remaining {
                receive += remaining / ask.price;
                remaining = Decimal::ZERO;
                break;
            }
            receive += ask.amount;
            remaining -= level_value;
        }
    } else {
        for bid in &book.bids {
            if bid.amount >= remaining {
                receive += remaining * bid.price;
                remaining = Decimal::ZERO;
                break;
            }
            receive += bid.amount * bid.price;
            remaining -= bid.amount;
        }
    }

    if remaining > Decimal::ZERO {
        return Err(Rejection::DepthNotEnough {
            market: market.id.clone(),
            remaining,
        });
    }
    Ok(receive)
}

//! Bid decision.
//!
//! Split in phases so the caller only fetches the order book for an
//! auction that survives the cheap checks:
//! 1. `screen`: allow-list and finished flag
//! 2. `size`: balance truncation and minimum notional
//! 3. `assess`: depth walk and profit threshold

use crate::config::StrategyConfig;
use crate::depth::sell_receive_amount;
use crate::error::{Rejection, StrategyResult};
use auction_core::{Auction, Inventory, Market};
use auction_exchange::OrderBook;
use rust_decimal::Decimal;
use tracing::debug;

/// Amounts the bot can afford for one auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    /// Debt to repay.
    pub debt: Decimal,
    /// Collateral expected in return.
    pub collateral: Decimal,
}

/// Accepted bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub auction_id: u32,
    pub debt: Decimal,
    pub collateral: Decimal,
    /// Debt asset expected from selling `collateral` into the book.
    pub expected_receive: Decimal,
}

/// Stateless decision engine over a fixed configuration.
#[derive(Debug, Clone)]
pub struct BidEngine {
    config: StrategyConfig,
}

impl BidEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Checks that need no balances or prices: allow-list and finished flag.
    pub fn screen(&self, auction: &Auction) -> StrategyResult<()> {
        if !self.config.allows(&auction.trading_pair) {
            return Err(Rejection::MarketNotAllowed(auction.trading_pair.clone()));
        }
        if auction.finished {
            return Err(Rejection::Finished);
        }
        Ok(())
    }

    /// Size the bid from the free debt balance.
    ///
    /// When the free balance is below the available debt, the bid is scaled
    /// down proportionally so the auction price is preserved.
    pub fn size(
        &self,
        auction: &Auction,
        inventory: &Inventory,
        collateral_usd_price: Decimal,
    ) -> StrategyResult<Sizing> {
        self.screen(auction)?;

        let free = inventory.free(&auction.debt_symbol);
        if free <= Decimal::ZERO {
            return Err(Rejection::ZeroBalance(auction.debt_symbol.clone()));
        }

        let sizing = if free < auction.available_debt {
            Sizing {
                debt: free,
                collateral: free / auction.available_debt * auction.available_collateral,
            }
        } else {
            Sizing {
                debt: auction.available_debt,
                collateral: auction.available_collateral,
            }
        };

        let value_usd = sizing.collateral * collateral_usd_price;
        if value_usd <= self.config.min_order_value_usd {
            return Err(Rejection::NotionalTooSmall {
                value_usd,
                min_usd: self.config.min_order_value_usd,
            });
        }

        debug!(
            auction_id = auction.id,
            debt = %sizing.debt,
            collateral = %sizing.collateral,
            %value_usd,
            "Sized bid"
        );
        Ok(sizing)
    }

    /// Check the sized bid against the hedge market's depth and the margin.
    pub fn assess(
        &self,
        auction: &Auction,
        sizing: Sizing,
        market: &Market,
        book: &OrderBook,
    ) -> StrategyResult<Decision> {
        let receive = sell_receive_amount(book, market, &auction.collateral_symbol, sizing.collateral)?;
        let threshold = sizing.debt * (Decimal::ONE + self.config.profit_margin);

        if receive <= threshold {
            return Err(Rejection::NotProfitable { receive, threshold });
        }

        Ok(Decision {
            auction_id: auction.id,
            debt: sizing.debt,
            collateral: sizing.collateral,
            expected_receive: receive,
        })
    }

    /// All phases in one call.
    pub fn evaluate(
        &self,
        auction: &Auction,
        inventory: &Inventory,
        collateral_usd_price: Decimal,
        market: &Market,
        book: &OrderBook,
    ) -> StrategyResult<Decision> {
        let sizing = self.size(auction, inventory, collateral_usd_price)?;
        self.assess(auction, sizing, market, book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use auction_core::{Asset, Balance};
    use auction_exchange::PriceLevel;
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
            min_order_size: dec!(10),
        }
    }

    /// 100 DAI of debt against 40 ETH of collateral.
    fn auction() -> Auction {
        Auction::new(9, "DAI", "ETH", "ETH-DAI", dec!(100), dec!(40), dec!(1), false)
    }

    fn inventory(free_dai: Decimal) -> Inventory {
        let mut inventory = Inventory::new();
        inventory.insert("DAI", Balance::new(free_dai, dec!(0)));
        inventory
    }

    /// One bid level deep enough for 24 ETH at `price`.
    fn book(price: Decimal) -> OrderBook {
        OrderBook {
            market_id: "ETH-DAI".to_string(),
            bids: vec![PriceLevel::new(price, dec!(100))],
            asks: vec![],
        }
    }

    fn engine() -> BidEngine {
        BidEngine::new(StrategyConfig::default())
    }

    #[test]
    fn test_truncation_preserves_price() {
        let sizing = engine().size(&auction(), &inventory(dec!(60)), dec!(10)).unwrap();
        assert_eq!(sizing.debt, dec!(60));
        assert_eq!(sizing.collateral, dec!(24));
    }

    #[test]
    fn test_full_fill_when_balance_covers_debt() {
        let sizing = engine().size(&auction(), &inventory(dec!(500)), dec!(10)).unwrap();
        assert_eq!(sizing.debt, dec!(100));
        assert_eq!(sizing.collateral, dec!(40));
    }

    #[test]
    fn test_notional_check() {
        // 24 ETH at $10 = $240, above the $100 minimum.
        assert!(engine().size(&auction(), &inventory(dec!(60)), dec!(10)).is_ok());

        // 24 ETH at $4 = $96.
        let err = engine().size(&auction(), &inventory(dec!(60)), dec!(4)).unwrap_err();
        assert_eq!(err.reason(), "notional_too_small");
    }

    #[test]
    fn test_notional_equal_to_minimum_is_rejected() {
        // 25 DAI buys 10 ETH, worth exactly $100.
        let err = engine().size(&auction(), &inventory(dec!(25)), dec!(10)).unwrap_err();
        assert!(matches!(err, Rejection::NotionalTooSmall { .. }));
    }

    #[test]
    fn test_profitability_threshold() {
        let engine = engine();
        let sizing = Sizing {
            debt: dec!(60),
            collateral: dec!(24),
        };

        // Threshold is 60 * 1.01 = 60.6.
        let decision = engine
            .assess(&auction(), sizing, &market(), &book(dec!(70) / dec!(24)))
            .unwrap();
        assert_eq!(decision.debt, dec!(60));
        assert!(decision.expected_receive > dec!(60.6));

        let err = engine
            .assess(&auction(), sizing, &market(), &book(dec!(2.5)))
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::NotProfitable {
                receive: dec!(60),
                threshold: dec!(60.6),
            }
        );
    }

    #[test]
    fn test_rejections_before_sizing() {
        let engine = BidEngine::new(StrategyConfig {
            markets: vec!["ETH-USDT".to_string()],
            ..Default::default()
        });
        assert_eq!(
            engine.size(&auction(), &inventory(dec!(60)), dec!(10)).unwrap_err(),
            Rejection::MarketNotAllowed("ETH-DAI".to_string())
        );

        let finished = Auction::new(9, "DAI", "ETH", "ETH-DAI", dec!(100), dec!(40), dec!(1), true);
        assert_eq!(
            BidEngine::new(StrategyConfig::default())
                .size(&finished, &inventory(dec!(60)), dec!(10))
                .unwrap_err(),
            Rejection::Finished
        );

        assert_eq!(
            BidEngine::new(StrategyConfig::default())
                .size(&auction(), &Inventory::new(), dec!(10))
                .unwrap_err(),
            Rejection::ZeroBalance("DAI".to_string())
        );
    }

    #[test]
    fn test_evaluate_accepts_profitable_auction() {
        let decision = engine()
            .evaluate(&auction(), &inventory(dec!(60)), dec!(10), &market(), &book(dec!(3)))
            .unwrap();
        assert_eq!(decision.auction_id, 9);
        assert_eq!(decision.collateral, dec!(24));
        assert_eq!(decision.expected_receive, dec!(72));
    }
}

//! Strategy configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bidding thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Markets the bot may hedge on, e.g. `ETH-DAI`.
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    /// Adverse deviation from mid tolerated by the hedge order.
    #[serde(default = "default_max_slippage")]
    pub max_slippage: Decimal,
    /// Minimum collateral value worth bidding on.
    #[serde(default = "default_min_order_value_usd")]
    pub min_order_value_usd: Decimal,
    /// Required excess of hedge proceeds over repaid debt.
    #[serde(default = "default_profit_margin")]
    pub profit_margin: Decimal,
}

fn default_markets() -> Vec<String> {
    vec!["ETH-USDT".to_string(), "ETH-DAI".to_string()]
}

fn default_max_slippage() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_min_order_value_usd() -> Decimal {
    Decimal::from(100)
}

fn default_profit_margin() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            max_slippage: default_max_slippage(),
            min_order_value_usd: default_min_order_value_usd(),
            profit_margin: default_profit_margin(),
        }
    }
}

impl StrategyConfig {
    pub fn allows(&self, market_id: &str) -> bool {
        self.markets.iter().any(|m| m == market_id)
    }

    /// Validate configuration values.
    ///
    /// Returns Err if:
    /// - the market allow-list is empty
    /// - max_slippage is outside [0, 1)
    /// - min_order_value_usd or profit_margin is negative
    pub fn validate(&self) -> Result<(), String> {
        if self.markets.is_empty() {
            return Err("markets must not be empty".to_string());
        }
        if self.max_slippage.is_sign_negative() || self.max_slippage >= Decimal::ONE {
            return Err(format!(
                "max_slippage ({}) must be in [0, 1)",
                self.max_slippage
            ));
        }
        if self.min_order_value_usd.is_sign_negative() {
            return Err(format!(
                "min_order_value_usd ({}) must be non-negative",
                self.min_order_value_usd
            ));
        }
        if self.profit_margin.is_sign_negative() {
            return Err(format!(
                "profit_margin ({}) must be non-negative",
                self.profit_margin
            ));
        }
        Ok(())
    }
}

//! Price and amount truncation to market constraints.
//!
//! Order prices are limited to `price_precision` significant figures and then
//! `price_decimals` fractional digits; amounts to `amount_decimals` fractional
//! digits. Everything truncates toward zero, never rounds up.

use auction_core::Market;
use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate to `max_sig_figs` significant figures.
pub fn truncate_to_sig_figs(value: Decimal, max_sig_figs: u32) -> Decimal {
    if value.is_zero() || max_sig_figs == 0 {
        return Decimal::ZERO;
    }

    // 12345 -> 4, 1234.5 -> 3, 0.00123 -> -3
    let magnitude = magnitude(value.abs());
    let scale = max_sig_figs as i64 - magnitude - 1;

    if scale >= 0 {
        truncate_to_decimals(value, scale as u32)
    } else {
        let factor = (0..-scale).fold(Decimal::ONE, |acc, _| acc * Decimal::TEN);
        (value / factor).trunc() * factor
    }
}

/// Truncate to `max_decimals` fractional digits.
pub fn truncate_to_decimals(value: Decimal, max_decimals: u32) -> Decimal {
    value.round_dp_with_strategy(max_decimals, RoundingStrategy::ToZero)
}

/// Order price accepted by `market`.
pub fn order_price(market: &Market, price: Decimal) -> Decimal {
    truncate_to_decimals(
        truncate_to_sig_figs(price, market.price_precision),
        market.price_decimals,
    )
    .normalize()
}

/// Order amount accepted by `market`.
pub fn order_amount(market: &Market, amount: Decimal) -> Decimal {
    truncate_to_decimals(amount, market.amount_decimals).normalize()
}

/// Order of magnitude of a positive decimal.
fn magnitude(value: Decimal) -> i64 {
    let int_part = value.trunc();
    if !int_part.is_zero() {
        return int_part.to_string().len() as i64 - 1;
    }

    // Below one: the position of the first non-zero fractional digit.
    let mut magnitude = 0i64;
    let mut scaled = value;
    while scaled < Decimal::ONE {
        scaled *= Decimal::TEN;
        magnitude -= 1;
    }
    magnitude
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
            amount_decimals: 3,
            min_order_size: dec!(10),
        }
    }

    #[test]
    fn test_truncate_to_sig_figs() {
        assert_eq!(truncate_to_sig_figs(dec!(12345.678), 5), dec!(12345));
        assert_eq!(truncate_to_sig_figs(dec!(1234.5678), 5), dec!(1234.5));
        assert_eq!(truncate_to_sig_figs(dec!(123456), 5), dec!(123450));
        assert_eq!(truncate_to_sig_figs(dec!(0.00123456), 3), dec!(0.00123));
        assert_eq!(truncate_to_sig_figs(dec!(0), 5), dec!(0));
    }

    #[test]
    fn test_sig_figs_count_from_first_nonzero_digit() {
        // Leading zeros are not significant.
        assert_eq!(truncate_to_sig_figs(dec!(0.0123456), 5), dec!(0.012345));
        assert_eq!(truncate_to_sig_figs(dec!(0.5), 1), dec!(0.5));
        // Whole digits past the limit become zeros; the magnitude never changes.
        assert_eq!(truncate_to_sig_figs(dec!(9876543), 3), dec!(9870000));
        assert_eq!(truncate_to_sig_figs(dec!(-187.4567), 4), dec!(-187.4));
    }

    #[test]
    fn test_truncate_never_rounds_up() {
        assert_eq!(truncate_to_sig_figs(dec!(9.99999), 3), dec!(9.99));
        assert_eq!(truncate_to_decimals(dec!(1.999), 2), dec!(1.99));
    }

    #[test]
    fn test_order_price_applies_both_limits() {
        // 5 significant figures gives 187.45, then 2 decimals keeps it.
        assert_eq!(order_price(&market(), dec!(187.4567)), dec!(187.45));
        // 5 significant figures gives 0.012345, then 2 decimals gives 0.01.
        assert_eq!(order_price(&market(), dec!(0.0123456)), dec!(0.01));
    }

    #[test]
    fn test_order_amount() {
        assert_eq!(order_amount(&market(), dec!(2.34567)), dec!(2.345));
        assert_eq!(order_amount(&market(), dec!(24)), dec!(24));
    }
}

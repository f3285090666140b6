//! Exact conversion between raw on-chain integers and decimal amounts.
//!
//! Token amounts travel over the wire as unsigned integers scaled by the
//! asset's decimal exponent. Decoding never rounds. Encoding truncates toward
//! zero, so an encoded amount never exceeds the decimal it came from.

use crate::error::{CoreError, Result};
use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal exponent of the chain's native currency (wei per ether).
pub const NATIVE_DECIMALS: u32 = 18;

/// Exponent between gwei and wei.
const GWEI_DECIMALS: u32 = 9;

/// Largest scale `Decimal` can represent.
const MAX_SCALE: u32 = 28;

/// Convert a raw integer amount into a decimal with `decimals` fractional digits.
///
/// `raw` must fit the 96-bit `Decimal` mantissa, so the largest convertible
/// value is `2^96 - 1` (about 7.9e28) whatever `decimals` is. For an 18-decimal
/// token that caps a single amount at roughly 79 billion whole tokens. Larger
/// values are rejected, never rounded.
///
/// # Errors
/// Returns `CoreError::AmountOutOfRange` if the value does not fit the 96-bit
/// decimal mantissa, or `CoreError::UnsupportedDecimals` for exponents above 28.
pub fn to_decimal(raw: U256, decimals: u32) -> Result<Decimal> {
    if decimals > MAX_SCALE {
        return Err(CoreError::UnsupportedDecimals(decimals));
    }

    let value = u128::try_from(raw)
        .ok()
        .and_then(|v| i128::try_from(v).ok())
        .ok_or_else(|| CoreError::AmountOutOfRange(raw.to_string()))?;

    Decimal::try_from_i128_with_scale(value, decimals)
        .map(|d| d.normalize())
        .map_err(|_| CoreError::AmountOutOfRange(raw.to_string()))
}

/// Convert a decimal amount into its raw integer form, truncating toward zero.
///
/// # Errors
/// Returns `CoreError::NegativeAmount` for values below zero.
pub fn to_raw(amount: Decimal, decimals: u32) -> Result<U256> {
    if decimals > MAX_SCALE {
        return Err(CoreError::UnsupportedDecimals(decimals));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CoreError::NegativeAmount(amount));
    }

    let truncated = amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    let mantissa = u128::try_from(truncated.mantissa())
        .map_err(|_| CoreError::NegativeAmount(amount))?;
    let shift = decimals - truncated.scale();

    Ok(U256::from(mantissa) * pow10(shift))
}

/// Convert a gwei-denominated gas price into wei.
pub fn gwei_to_wei(gwei: Decimal) -> Result<U256> {
    to_raw(gwei, GWEI_DECIMALS)
}

/// Gas cost of a mined transaction in native currency units.
///
/// `gas_used * gas_price_wei` is computed in integers and only then scaled,
/// so no fractional wei is ever lost.
pub fn gas_cost(gas_used: u64, gas_price_wei: U256) -> Result<Decimal> {
    let wei = U256::from(gas_used)
        .checked_mul(gas_price_wei)
        .ok_or_else(|| CoreError::AmountOutOfRange(format!("{gas_used} * {gas_price_wei}")))?;
    to_decimal(wei, NATIVE_DECIMALS)
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal_scales_by_exponent() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(to_decimal(one_eth, 18).unwrap(), dec!(1));

        let usdt = U256::from(123_456_789u64);
        assert_eq!(to_decimal(usdt, 6).unwrap(), dec!(123.456789));
    }

    #[test]
    fn test_raw_round_trip_is_exact() {
        let cases: [(u128, u32); 6] = [
            (0, 18),
            (1, 18),
            (123_456_789, 6),
            (999_999_999_999_999_999_999, 18),
            (42, 0),
            (10_000_000_000_000_000_000_000_000, 8),
        ];

        for (raw, decimals) in cases {
            let raw = U256::from(raw);
            let amount = to_decimal(raw, decimals).unwrap();
            assert_eq!(to_raw(amount, decimals).unwrap(), raw, "decimals={decimals}");
        }
    }

    #[test]
    fn test_to_raw_truncates_toward_zero() {
        assert_eq!(to_raw(dec!(1.2345679), 6).unwrap(), U256::from(1_234_567u64));
        assert_eq!(to_raw(dec!(0.0000009), 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_raw_pads_short_scale() {
        assert_eq!(
            to_raw(dec!(60), 18).unwrap(),
            U256::from(60_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_to_raw_rejects_negative() {
        assert!(matches!(
            to_raw(dec!(-1), 18),
            Err(CoreError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_to_decimal_rejects_oversized_values() {
        assert!(matches!(
            to_decimal(U256::MAX, 18),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert!(matches!(
            to_decimal(U256::from(1u64), 29),
            Err(CoreError::UnsupportedDecimals(29))
        ));
    }

    #[test]
    fn test_to_decimal_mantissa_boundary() {
        let max = U256::from(u128::from(u64::MAX) << 32 | u128::from(u32::MAX));
        assert_eq!(max, (U256::from(1u64) << 96) - U256::from(1u64));
        assert_eq!(
            to_decimal(max, 18).unwrap(),
            Decimal::from_i128_with_scale((1i128 << 96) - 1, 18)
        );
        assert_eq!(to_raw(to_decimal(max, 18).unwrap(), 18).unwrap(), max);

        assert!(matches!(
            to_decimal(U256::from(1u64) << 96, 18),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert!(matches!(
            to_decimal(U256::from(1u64) << 96, 0),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert_eq!(to_decimal(U256::from(1u64), 28).unwrap(), dec!(0.0000000000000000000000000001));
    }

    #[test]
    fn test_gas_cost_exact() {
        let price = gwei_to_wei(dec!(20)).unwrap();
        assert_eq!(price, U256::from(20_000_000_000u64));
        assert_eq!(gas_cost(150_000, price).unwrap(), dec!(0.003));
    }

    #[test]
    fn test_gwei_to_wei_fractional() {
        assert_eq!(gwei_to_wei(dec!(1.5)).unwrap(), U256::from(1_500_000_000u64));
    }
}

//! Decimal arithmetic utilities for monetary values.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Signed percent change from `from` to `to`.
pub fn percent_change(from: Decimal, to: Decimal) -> Decimal {
    safe_div(to - from, from) * dec!(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_precision() {
        assert_eq!(round_to_precision(dec!(2543.256), 2), dec!(2543.26));
        assert_eq!(round_to_precision(dec!(2543.254), 2), dec!(2543.25));
        assert_eq!(round_to_precision(dec!(2543), 2), dec!(2543));
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(dec!(10), dec!(4)), dec!(2.5));
        assert_eq!(safe_div(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(dec!(2500), dec!(2600)), dec!(4));
        assert_eq!(percent_change(dec!(400), dec!(380)), dec!(-5));
        assert_eq!(percent_change(Decimal::ZERO, dec!(100)), Decimal::ZERO);
    }
}

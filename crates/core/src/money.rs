//! # Money Module
//!
//! Amounts are plain `rust_decimal::Decimal` values in the platform's single
//! currency. Rounding to cents happens only at presentation boundaries.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places shown for money amounts
pub const MONEY_DP: u32 = 2;

/// Round to cents, midpoint away from zero (16.665 -> 16.67).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Check an amount is strictly positive
pub fn is_positive(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(dec!(16.665)), dec!(16.67));
        assert_eq!(round_money(dec!(16.664)), dec!(16.66));
        assert_eq!(round_money(dec!(-2.005)), dec!(-2.01));
    }

    #[test]
    fn test_round_money_repeating_fraction() {
        let interest = dec!(500) * dec!(10) * dec!(10) / dec!(3000);
        assert_eq!(round_money(interest), dec!(16.67));
    }

    #[test]
    fn test_is_positive() {
        assert!(is_positive(dec!(0.01)));
        assert!(!is_positive(Decimal::ZERO));
        assert!(!is_positive(dec!(-1)));
    }
}

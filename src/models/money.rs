//! Money and rate helpers shared by the primitives and calculators.

use rust_decimal::{Decimal, RoundingStrategy};

/// A monetary amount. Always a `Decimal`, never a float.
pub type Money = Decimal;

/// A rate expressed as a fraction (`0.062` is 6.2%).
pub type Rate = Decimal;

/// Number of decimal places kept for rates surfaced in outputs.
const RATE_DP: u32 = 6;

/// Rounds a monetary amount to cents, midpoint away from zero.
///
/// # Example
///
/// ```
/// use finance_calc_engine::models::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rounded = round_money(Decimal::from_str("2884.615384").unwrap());
/// assert_eq!(rounded, Decimal::from_str("2884.62").unwrap());
/// ```
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a fractional rate for display.
pub fn round_rate(value: Rate) -> Rate {
    value
        .round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Converts a fraction to a percentage rounded to two places.
pub fn as_percent(rate: Rate) -> Decimal {
    round_money(rate * Decimal::ONE_HUNDRED)
}

/// Divides `numerator` by `denominator`, yielding zero when the denominator is zero.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Divides `numerator` by `denominator`: zero for a zero denominator, `None`
/// when the quotient does not fit in a `Decimal`.
pub fn checked_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        Some(Decimal::ZERO)
    } else {
        numerator.checked_div(denominator)
    }
}

//! Shared arithmetic for the tax calculations.
//!
//! Money stays at full decimal precision inside the engine; rounding to cents
//! happens only where a figure is presented.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Number of payroll periods in a tax year for monthly PAYE.
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use paye_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps a value at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// `part` as a percentage of `whole`, or zero when `whole` is not positive.
///
/// ```
/// use rust_decimal_macros::dec;
/// use paye_core::calculations::common::percentage_of;
///
/// assert_eq!(percentage_of(dec!(25), dec!(200)), dec!(12.5));
/// assert_eq!(percentage_of(dec!(25), dec!(0)), dec!(0));
/// ```
pub fn percentage_of(
    part: Decimal,
    whole: Decimal,
) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Scales a monthly amount up to a year, or `None` if the result does not
/// fit in a `Decimal`.
pub fn annualize(monthly: Decimal) -> Option<Decimal> {
    monthly.checked_mul(MONTHS_PER_YEAR)
}

/// Apportions an annual amount to one month.
pub fn per_month(annual: Decimal) -> Decimal {
    annual / MONTHS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(1771.644)), dec!(1771.64));
        assert_eq!(round_half_up(dec!(1771.6449)), dec!(1771.64));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        let result = round_half_up(dec!(3483.005));

        assert_eq!(result, dec!(3483.01));
    }

    #[test]
    fn round_half_up_handles_negative_values() {
        let result = round_half_up(dec!(-0.125));

        assert_eq!(result, dec!(-0.13));
    }

    #[test]
    fn round_half_up_handles_repeating_monthly_fractions() {
        // 41796.74 / 12
        let result = round_half_up(per_month(dec!(41796.74)));

        assert_eq!(result, dec!(3483.06));
    }

    // =========================================================================
    // non_negative tests
    // =========================================================================

    #[test]
    fn non_negative_keeps_positive_values() {
        assert_eq!(non_negative(dec!(59031.74)), dec!(59031.74));
    }

    #[test]
    fn non_negative_clamps_negative_values() {
        assert_eq!(non_negative(dec!(-17235)), dec!(0));
    }

    // =========================================================================
    // percentage_of tests
    // =========================================================================

    #[test]
    fn percentage_of_returns_percentage() {
        let result = percentage_of(dec!(41796.74), dec!(300000));

        assert_eq!(round_half_up(result), dec!(13.93));
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert_eq!(percentage_of(dec!(100), dec!(0)), dec!(0));
    }

    #[test]
    fn percentage_of_negative_whole_is_zero() {
        assert_eq!(percentage_of(dec!(100), dec!(-5)), dec!(0));
    }

    // =========================================================================
    // period conversion tests
    // =========================================================================

    #[test]
    fn annualize_multiplies_by_twelve() {
        assert_eq!(annualize(dec!(25000)), Some(dec!(300000)));
    }

    #[test]
    fn annualize_out_of_range_is_none() {
        assert_eq!(annualize(dec!(10000000000000000000000000000)), None);
        assert_eq!(annualize(Decimal::MAX), None);
    }

    #[test]
    fn per_month_divides_by_twelve() {
        assert_eq!(per_month(dec!(17235)), dec!(1436.25));
    }

    #[test]
    fn months_per_year_is_twelve() {
        assert_eq!(MONTHS_PER_YEAR, dec!(12));
    }
}

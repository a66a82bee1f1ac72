//! Load-time checks for tax schedules.
//!
//! The calculator trusts its schedule: it assumes ordered, contiguous brackets
//! ending in an unbounded one and base amounts that match the lower brackets.
//! [`validate_schedule`] enforces those assumptions before a schedule is made
//! available for lookup.
//!
//! Published tables usually use whole-currency boundaries where a bracket
//! ending at `50000` is followed by one starting at `50001`. Both that
//! convention and shared boundaries (`to_amount == next.from_amount`) count as
//! contiguous.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::models::{ScheduleKey, TaxBracket, TaxSchedule};

/// Largest accepted difference between a bracket's `base_amount` and the tax
/// accumulated by the brackets below it. Published bases are rounded to whole
/// currency units.
pub const BASE_AMOUNT_TOLERANCE: Decimal = dec!(1);

/// Largest accepted gap between one bracket's `to_amount` and the next
/// bracket's `from_amount`.
pub const MAX_BRACKET_GAP: Decimal = dec!(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleValidationError {
    #[error("schedule {0} has no brackets")]
    NoBrackets(ScheduleKey),

    #[error("schedule {key}: first bracket starts at {from}, expected 0")]
    DoesNotStartAtZero { key: ScheduleKey, from: Decimal },

    #[error("schedule {key}: bracket {index} has a negative amount")]
    NegativeAmount { key: ScheduleKey, index: usize },

    #[error("schedule {key}: bracket {index} rate {rate} is outside 0-100")]
    RateOutOfRange {
        key: ScheduleKey,
        index: usize,
        rate: Decimal,
    },

    #[error("schedule {key}: bracket {index} ends at {to} before it starts at {from}")]
    InvertedBracket {
        key: ScheduleKey,
        index: usize,
        from: Decimal,
        to: Decimal,
    },

    #[error("schedule {key}: bracket {index} is not ordered by from_amount")]
    UnsortedBrackets { key: ScheduleKey, index: usize },

    #[error("schedule {key}: bracket {index} overlaps the bracket before it")]
    OverlappingBrackets { key: ScheduleKey, index: usize },

    #[error("schedule {key}: gap between {previous_to} and {from} before bracket {index}")]
    BracketGap {
        key: ScheduleKey,
        index: usize,
        previous_to: Decimal,
        from: Decimal,
    },

    #[error("schedule {key}: unbounded bracket {index} is not the last bracket")]
    UnboundedBracketNotLast { key: ScheduleKey, index: usize },

    #[error("schedule {0}: last bracket must be unbounded")]
    MissingUnboundedBracket(ScheduleKey),

    #[error("schedule {key}: bracket {index} base amount {actual} does not match {expected}")]
    BaseAmountMismatch {
        key: ScheduleKey,
        index: usize,
        expected: Decimal,
        actual: Decimal,
    },

    #[error("schedule {key}: {rebate} rebate is negative")]
    NegativeRebate {
        key: ScheduleKey,
        rebate: &'static str,
    },
}

/// Checks that `schedule` is well formed.
///
/// # Errors
///
/// Returns the first [`ScheduleValidationError`] found, scanning brackets
/// from the bottom up and rebates last.
pub fn validate_schedule(schedule: &TaxSchedule) -> Result<(), ScheduleValidationError> {
    let key = schedule.key();

    let Some(first) = schedule.brackets.first() else {
        return Err(ScheduleValidationError::NoBrackets(key));
    };
    if first.from_amount != Decimal::ZERO {
        return Err(ScheduleValidationError::DoesNotStartAtZero {
            key,
            from: first.from_amount,
        });
    }

    for (index, bracket) in schedule.brackets.iter().enumerate() {
        check_bracket(&key, index, bracket)?;
    }

    if first.base_amount != Decimal::ZERO {
        return Err(ScheduleValidationError::BaseAmountMismatch {
            key,
            index: 0,
            expected: Decimal::ZERO,
            actual: first.base_amount,
        });
    }

    for (index, pair) in schedule.brackets.windows(2).enumerate() {
        check_adjacent(&key, index + 1, &pair[0], &pair[1])?;
    }

    if schedule.brackets.last().is_some_and(|b| !b.is_unbounded()) {
        return Err(ScheduleValidationError::MissingUnboundedBracket(key));
    }

    check_rebates(&key, schedule)
}

fn check_bracket(
    key: &ScheduleKey,
    index: usize,
    bracket: &TaxBracket,
) -> Result<(), ScheduleValidationError> {
    let negative = bracket.from_amount < Decimal::ZERO
        || bracket.base_amount < Decimal::ZERO
        || bracket.to_amount.is_some_and(|to| to < Decimal::ZERO);
    if negative {
        return Err(ScheduleValidationError::NegativeAmount {
            key: key.clone(),
            index,
        });
    }

    if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE_HUNDRED {
        return Err(ScheduleValidationError::RateOutOfRange {
            key: key.clone(),
            index,
            rate: bracket.rate,
        });
    }

    if let Some(to) = bracket.to_amount
        && to < bracket.from_amount
    {
        return Err(ScheduleValidationError::InvertedBracket {
            key: key.clone(),
            index,
            from: bracket.from_amount,
            to,
        });
    }

    Ok(())
}

/// Checks `current` (at `index`) against the bracket directly below it.
fn check_adjacent(
    key: &ScheduleKey,
    index: usize,
    previous: &TaxBracket,
    current: &TaxBracket,
) -> Result<(), ScheduleValidationError> {
    let Some(previous_to) = previous.to_amount else {
        return Err(ScheduleValidationError::UnboundedBracketNotLast {
            key: key.clone(),
            index: index - 1,
        });
    };

    if current.from_amount <= previous.from_amount {
        return Err(ScheduleValidationError::UnsortedBrackets {
            key: key.clone(),
            index,
        });
    }
    if current.from_amount < previous_to {
        return Err(ScheduleValidationError::OverlappingBrackets {
            key: key.clone(),
            index,
        });
    }
    if current.from_amount - previous_to > MAX_BRACKET_GAP {
        return Err(ScheduleValidationError::BracketGap {
            key: key.clone(),
            index,
            previous_to,
            from: current.from_amount,
        });
    }

    let expected = previous.base_amount
        + previous.rate_fraction() * (previous_to - previous.from_amount);
    if (current.base_amount - expected).abs() > BASE_AMOUNT_TOLERANCE {
        return Err(ScheduleValidationError::BaseAmountMismatch {
            key: key.clone(),
            index,
            expected,
            actual: current.base_amount,
        });
    }

    Ok(())
}

fn check_rebates(
    key: &ScheduleKey,
    schedule: &TaxSchedule,
) -> Result<(), ScheduleValidationError> {
    let Some(rebates) = &schedule.rebates else {
        return Ok(());
    };

    let amounts = [
        ("primary", Some(rebates.primary)),
        ("secondary", rebates.secondary),
        ("tertiary", rebates.tertiary),
        ("medical aid", rebates.medical_aid),
    ];
    for (rebate, amount) in amounts {
        if amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(ScheduleValidationError::NegativeRebate {
                key: key.clone(),
                rebate,
            });
        }
    }

    Ok(())
}

//! Progressive bracket tax for a full tax year.
//!
//! Tax for an income is read off the income's marginal bracket:
//!
//! ```text
//! tax = base_amount + rate% * (income - from_amount)
//! ```
//!
//! where `base_amount` is the tax already accumulated by every lower bracket.
//! Rebates are then subtracted, floored at zero.
//!
//! | Rebate      | Granted when                     |
//! |-------------|----------------------------------|
//! | primary     | always                           |
//! | secondary   | age >= 65                        |
//! | tertiary    | age >= 75 (on top of secondary)  |
//! | medical aid | per member, when members > 0     |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use paye_core::{calculate_tax, get_schedule};
//!
//! let schedule = get_schedule("South Africa", "2025").unwrap();
//! let result = calculate_tax(dec!(300000), &schedule, 30, 0).unwrap();
//!
//! assert_eq!(result.tax_before_rebates, dec!(59031.74));
//! assert_eq!(result.rebates.total, dec!(17235));
//! assert_eq!(result.tax_payable, dec!(41796.74));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{non_negative, percentage_of};
use crate::models::{
    BracketTax, RebateBreakdown, TaxBracket, TaxCalculationResult, TaxSchedule, TaxpayerProfile,
};

/// Age from which the secondary rebate applies.
pub const SECONDARY_REBATE_AGE: u32 = 65;

/// Age from which the tertiary rebate applies.
pub const TERTIARY_REBATE_AGE: u32 = 75;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxCalculationError {
    /// The income is negative or no bracket of the schedule covers it. With a
    /// validated schedule only a negative income gets here.
    #[error("no applicable tax bracket for taxable income {0}")]
    NoApplicableBracket(Decimal),

    /// An amount left the range a `Decimal` can hold. Names the figure being
    /// computed.
    #[error("{0} is out of range")]
    Overflow(&'static str),
}

/// Calculator for one tax schedule.
#[derive(Debug, Clone)]
pub struct BracketTaxCalculator<'a> {
    schedule: &'a TaxSchedule,
}

impl<'a> BracketTaxCalculator<'a> {
    /// The schedule's brackets must be ordered by `from_amount`; see
    /// [`validate_schedule`](crate::schedules::validate_schedule).
    pub fn new(schedule: &'a TaxSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &'a TaxSchedule {
        self.schedule
    }

    /// Calculates annual tax on `annual_taxable_income`.
    ///
    /// An income inside a sub-unit gap between whole-unit brackets (e.g.
    /// `50000.5` between `..=50000` and `50001..`) is taxed in the lower
    /// bracket instead of being rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::NoApplicableBracket`] if the income is
    /// negative or falls outside every bracket, and
    /// [`TaxCalculationError::Overflow`] if the tax does not fit in a
    /// `Decimal` (only reachable with an unvalidated schedule).
    pub fn calculate(
        &self,
        annual_taxable_income: Decimal,
        profile: &TaxpayerProfile,
    ) -> Result<TaxCalculationResult, TaxCalculationError> {
        let income = annual_taxable_income;
        let selected = self.select_bracket(income)?;
        let bracket = &self.schedule.brackets[selected];

        debug!(
            schedule = %self.schedule.id,
            %income,
            bracket = %bracket.id,
            "selected marginal bracket"
        );

        let tax_before_rebates = Self::marginal_tax(bracket, income)?;
        let tax_brackets = self.breakdown(income, selected, tax_before_rebates);
        debug_assert_eq!(
            tax_brackets.iter().map(|b| b.tax_for_bracket).sum::<Decimal>(),
            tax_before_rebates
        );

        let rebates = self.rebates(profile);
        let tax_payable = non_negative(tax_before_rebates - rebates.total);
        let effective_rate = percentage_of(tax_payable, income);

        Ok(TaxCalculationResult {
            taxable_income: income,
            tax_before_rebates,
            rebates,
            tax_payable,
            effective_rate,
            tax_brackets,
        })
    }

    /// Index of the bracket that holds `income`.
    ///
    /// Schedules with whole-unit boundaries (one bracket ends at `50000`, the
    /// next starts at `50001`) leave a sub-unit gap; an income inside it is
    /// taxed in the lower bracket.
    fn select_bracket(
        &self,
        income: Decimal,
    ) -> Result<usize, TaxCalculationError> {
        if income < Decimal::ZERO {
            return Err(TaxCalculationError::NoApplicableBracket(income));
        }

        let brackets = &self.schedule.brackets;
        if let Some(index) = brackets.iter().position(|b| b.contains(income)) {
            return Ok(index);
        }

        brackets
            .iter()
            .rposition(|b| b.from_amount <= income)
            .filter(|&index| {
                brackets
                    .get(index + 1)
                    .is_some_and(|next| income < next.from_amount)
            })
            .ok_or(TaxCalculationError::NoApplicableBracket(income))
    }

    fn marginal_tax(
        bracket: &TaxBracket,
        income: Decimal,
    ) -> Result<Decimal, TaxCalculationError> {
        bracket
            .rate_fraction()
            .checked_mul(income - bracket.from_amount)
            .and_then(|tax| tax.checked_add(bracket.base_amount))
            .ok_or(TaxCalculationError::Overflow("tax before rebates"))
    }

    /// Per-bracket share of `tax_before_rebates`.
    ///
    /// Every bracket below the marginal one is taxed at its own rate on its
    /// full width. The marginal bracket gets the remainder, so the shares
    /// always sum to `tax_before_rebates`; any rounding in the published base
    /// amounts lands there.
    fn breakdown(
        &self,
        income: Decimal,
        selected: usize,
        tax_before_rebates: Decimal,
    ) -> Vec<BracketTax> {
        let mut tax_brackets = Vec::new();
        let mut other_brackets_tax = Decimal::ZERO;
        let mut marginal_position = None;

        for (index, bracket) in self.schedule.brackets.iter().enumerate() {
            if bracket.from_amount > income {
                continue;
            }

            if index == selected {
                marginal_position = Some(tax_brackets.len());
                tax_brackets.push(BracketTax {
                    bracket: bracket.clone(),
                    amount_in_bracket: income - bracket.from_amount,
                    tax_for_bracket: Decimal::ZERO,
                });
                continue;
            }

            let amount_in_bracket =
                bracket.to_amount.unwrap_or(income).min(income) - bracket.from_amount;
            let tax_for_bracket = bracket.rate_fraction() * amount_in_bracket;
            other_brackets_tax += tax_for_bracket;
            tax_brackets.push(BracketTax {
                bracket: bracket.clone(),
                amount_in_bracket,
                tax_for_bracket,
            });
        }

        if let Some(position) = marginal_position {
            tax_brackets[position].tax_for_bracket = tax_before_rebates - other_brackets_tax;
        }

        tax_brackets
    }

    fn rebates(
        &self,
        profile: &TaxpayerProfile,
    ) -> RebateBreakdown {
        let Some(rebates) = &self.schedule.rebates else {
            return RebateBreakdown::default();
        };

        let primary = rebates.primary;
        let secondary = match rebates.secondary {
            Some(amount) if profile.age >= SECONDARY_REBATE_AGE => amount,
            _ => Decimal::ZERO,
        };
        let tertiary = match rebates.tertiary {
            Some(amount) if profile.age >= TERTIARY_REBATE_AGE => amount,
            _ => Decimal::ZERO,
        };
        let medical_aid = match rebates.medical_aid {
            Some(per_member) if profile.medical_aid_members > 0 => {
                per_member * Decimal::from(profile.medical_aid_members)
            }
            _ => Decimal::ZERO,
        };

        RebateBreakdown {
            primary,
            secondary,
            tertiary,
            medical_aid,
            total: primary + secondary + tertiary + medical_aid,
        }
    }
}

/// Calculates annual tax on `annual_taxable_income` under `schedule`.
///
/// Shorthand for [`BracketTaxCalculator::calculate`]; callers without age or
/// medical aid details pass [`TaxpayerProfile::DEFAULT_AGE`] and `0`.
///
/// # Errors
///
/// See [`BracketTaxCalculator::calculate`].
pub fn calculate_tax(
    annual_taxable_income: Decimal,
    schedule: &TaxSchedule,
    age: u32,
    medical_aid_members: u32,
) -> Result<TaxCalculationResult, TaxCalculationError> {
    BracketTaxCalculator::new(schedule).calculate(
        annual_taxable_income,
        &TaxpayerProfile::new(age, medical_aid_members),
    )
}

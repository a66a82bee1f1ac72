//! Monthly PAYE withholding.
//!
//! A monthly earnings snapshot is annualized, taxed against the annual
//! schedule, and the summary figures are apportioned back to one month.
//!
//! | Field                | Annualized as |
//! |----------------------|---------------|
//! | gross salary         | × 12          |
//! | taxable allowances   | × 12          |
//! | taxable bonus        | as given      |
//! | retirement deduction | × 12          |
//! | medical aid          | × 12          |
//! | other deductions     | × 12          |
//!
//! The bonus is treated as an amount that already covers the whole year.
//! This asymmetry is kept deliberately for compatibility with existing
//! payroll figures.
//!
//! In the monthly result `taxable_income`, `tax_before_rebates`, every rebate
//! and `tax_payable` are monthly. `effective_rate` and `tax_brackets` are left
//! at annual scale; a payslip showing per-bracket amounts divides them itself.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use paye_core::{calculate_monthly_paye, Deductions, TaxableIncome};
//!
//! let earnings = TaxableIncome {
//!     gross_salary: dec!(25000),
//!     taxable_allowances: dec!(0),
//!     taxable_bonus: dec!(0),
//!     deductions: Deductions::default(),
//! };
//!
//! let result = calculate_monthly_paye(&earnings, "South Africa", "2025", 30, 0)
//!     .unwrap()
//!     .expect("South Africa 2025 is built in");
//!
//! assert_eq!(result.taxable_income, dec!(25000));
//! assert_eq!(result.rebates.primary, dec!(1436.25));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculations::bracket_tax::{BracketTaxCalculator, TaxCalculationError};
use crate::calculations::common::{annualize, non_negative, per_month};
use crate::models::{RebateBreakdown, TaxCalculationResult, TaxableIncome, TaxpayerProfile};
use crate::schedules::{ScheduleSource, builtin_source};

/// Annual figures derived from a monthly snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualizedIncome {
    pub gross_salary: Decimal,
    pub taxable_allowances: Decimal,
    pub taxable_bonus: Decimal,
    pub retirement_deduction: Decimal,
    pub medical_aid_deduction: Decimal,
    pub other_deductions: Decimal,
}

fn annualize_field(
    field: &'static str,
    monthly: Decimal,
) -> Result<Decimal, TaxCalculationError> {
    annualize(monthly).ok_or(TaxCalculationError::Overflow(field))
}

impl AnnualizedIncome {
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::Overflow`] naming the first field whose
    /// annual figure does not fit in a `Decimal`.
    pub fn from_monthly(earnings: &TaxableIncome) -> Result<Self, TaxCalculationError> {
        Ok(Self {
            gross_salary: annualize_field("gross_salary", earnings.gross_salary)?,
            taxable_allowances: annualize_field("taxable_allowances", earnings.taxable_allowances)?,
            taxable_bonus: earnings.taxable_bonus,
            retirement_deduction: annualize_field("retirement", earnings.deductions.retirement)?,
            medical_aid_deduction: annualize_field("medical_aid", earnings.deductions.medical_aid)?,
            other_deductions: annualize_field("other", earnings.deductions.other)?,
        })
    }

    /// Earnings less deductions. Negative when deductions exceed earnings.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::Overflow`] if a sum leaves the `Decimal`
    /// range.
    pub fn taxable_income(&self) -> Result<Decimal, TaxCalculationError> {
        let earnings = [self.taxable_allowances, self.taxable_bonus]
            .into_iter()
            .try_fold(self.gross_salary, Decimal::checked_add);
        let deductions = [self.medical_aid_deduction, self.other_deductions]
            .into_iter()
            .try_fold(self.retirement_deduction, Decimal::checked_add);

        earnings
            .zip(deductions)
            .and_then(|(earnings, deductions)| earnings.checked_sub(deductions))
            .ok_or(TaxCalculationError::Overflow("annual taxable income"))
    }
}

/// Monthly PAYE over any [`ScheduleSource`].
#[derive(Debug, Clone, Copy)]
pub struct PeriodAnnualizer<'a, S: ScheduleSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ScheduleSource + ?Sized> PeriodAnnualizer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Calculates one month's PAYE for `monthly_earnings`.
    ///
    /// Returns `Ok(None)` when `source` has no schedule for
    /// (`country`, `tax_year`).
    ///
    /// Annual taxable income below zero (deductions exceeding earnings) is
    /// taxed as zero.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::Overflow`] when the earnings are too
    /// large to annualize, and propagates calculator errors, which otherwise
    /// only happen for a malformed schedule.
    pub fn calculate_monthly_paye(
        &self,
        monthly_earnings: &TaxableIncome,
        country: &str,
        tax_year: &str,
        profile: &TaxpayerProfile,
    ) -> Result<Option<TaxCalculationResult>, TaxCalculationError> {
        let Some(schedule) = self.source.get_schedule(country, tax_year) else {
            warn!(country, tax_year, "tax calculation unavailable: no schedule");
            return Ok(None);
        };

        let annual = AnnualizedIncome::from_monthly(monthly_earnings)?;
        let mut annual_taxable_income = annual.taxable_income()?;
        if annual_taxable_income < Decimal::ZERO {
            warn!(
                %annual_taxable_income,
                "deductions exceed earnings; taxing zero income"
            );
            annual_taxable_income = non_negative(annual_taxable_income);
        }

        debug!(
            schedule = %schedule.id,
            %annual_taxable_income,
            "annualized monthly earnings"
        );

        let annual_result =
            BracketTaxCalculator::new(&schedule).calculate(annual_taxable_income, profile)?;

        Ok(Some(to_monthly(annual_result)))
    }
}

/// Apportions the summary figures of an annual result to one month.
pub fn to_monthly(annual: TaxCalculationResult) -> TaxCalculationResult {
    let rebates = &annual.rebates;
    TaxCalculationResult {
        taxable_income: per_month(annual.taxable_income),
        tax_before_rebates: per_month(annual.tax_before_rebates),
        rebates: RebateBreakdown {
            primary: per_month(rebates.primary),
            secondary: per_month(rebates.secondary),
            tertiary: per_month(rebates.tertiary),
            medical_aid: per_month(rebates.medical_aid),
            total: per_month(rebates.total),
        },
        tax_payable: per_month(annual.tax_payable),
        effective_rate: annual.effective_rate,
        tax_brackets: annual.tax_brackets,
    }
}

/// Calculates one month's PAYE against the built-in schedules.
///
/// # Errors
///
/// See [`PeriodAnnualizer::calculate_monthly_paye`].
pub fn calculate_monthly_paye(
    monthly_earnings: &TaxableIncome,
    country: &str,
    tax_year: &str,
    age: u32,
    medical_aid_members: u32,
) -> Result<Option<TaxCalculationResult>, TaxCalculationError> {
    PeriodAnnualizer::new(builtin_source()).calculate_monthly_paye(
        monthly_earnings,
        country,
        tax_year,
        &TaxpayerProfile::new(age, medical_aid_members),
    )
}

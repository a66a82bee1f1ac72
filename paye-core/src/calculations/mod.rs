//! Tax calculations.
//!
//! [`bracket_tax`] computes annual tax for one schedule; [`monthly_paye`]
//! wraps it for monthly payroll.

pub mod bracket_tax;
pub mod common;
pub mod monthly_paye;

pub use bracket_tax::{
    BracketTaxCalculator, SECONDARY_REBATE_AGE, TERTIARY_REBATE_AGE, TaxCalculationError,
    calculate_tax,
};
pub use monthly_paye::{AnnualizedIncome, PeriodAnnualizer, calculate_monthly_paye};
